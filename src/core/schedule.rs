use crate::prelude::*;

/// Width of the second-to-last layer under the wide-then-narrow schedule.
pub const NARROW_PIVOT_WIDTH: usize = 400;

/// Width-shrinkage schedule for a depth-`num_layers` network.
///
/// A schedule yields `num_layers + 1` widths; layer `i` maps
/// `widths[i] -> widths[i + 1]`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthPolicy {
    /// Widths fall from `input_dim` to `output_dim` in equal integer steps.
    LinearShrink,
    /// All but the last two layers stay at `input_dim`, then narrow through
    /// `NARROW_PIVOT_WIDTH` to `output_dim`.
    WideThenNarrow,
}

impl WidthPolicy {
    pub fn widths(
        &self,
        num_layers: usize,
        input_dim: usize,
        output_dim: usize,
    ) -> Result<Vec<usize>> {
        if num_layers == 0 || input_dim == 0 || output_dim == 0 {
            return Err(NNError::InvalidLayerConfiguration(
                "depth and dimensions must be greater than 0".to_string(),
            ));
        }
        if input_dim < output_dim {
            return Err(NNError::InvalidLayerConfiguration(format!(
                "input_dim {} must not be smaller than output_dim {}",
                input_dim, output_dim
            )));
        }
        match self {
            WidthPolicy::LinearShrink => {
                if num_layers > input_dim - output_dim {
                    return Err(NNError::DepthConstraint(format!(
                        "maximum depth exceeded: {} layers, at most input_dim - output_dim = {} supported",
                        num_layers,
                        input_dim - output_dim
                    )));
                }
                let step = (input_dim - output_dim) / num_layers;
                let mut widths = Vec::with_capacity(num_layers + 1);
                widths.push(input_dim);
                for i in 1..num_layers {
                    widths.push(input_dim - i * step);
                }
                widths.push(output_dim);
                Ok(widths)
            }
            WidthPolicy::WideThenNarrow => {
                if num_layers < 3 {
                    return Err(NNError::DepthConstraint(format!(
                        "minimum depth violated: wide-then-narrow needs at least 3 layers, got {}",
                        num_layers
                    )));
                }
                let mut widths = vec![input_dim; num_layers - 1];
                widths.push(NARROW_PIVOT_WIDTH);
                widths.push(output_dim);
                Ok(widths)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_shrink_is_nonincreasing_and_ends_at_output() {
        for (layers, input, output) in [(1, 10, 2), (4, 20, 4), (8, 100, 10), (30, 784, 10)] {
            let widths = WidthPolicy::LinearShrink.widths(layers, input, output).unwrap();
            assert_eq!(widths.len(), layers + 1);
            assert_eq!(widths[0], input);
            assert_eq!(*widths.last().unwrap(), output);
            for pair in widths.windows(2) {
                assert!(pair[0] >= pair[1], "widths {:?} increase", widths);
            }
        }
    }

    #[test]
    fn linear_shrink_rejects_excess_depth() {
        // 10 - 2 = 8 is the deepest valid network
        assert!(WidthPolicy::LinearShrink.widths(8, 10, 2).is_ok());
        assert!(matches!(
            WidthPolicy::LinearShrink.widths(9, 10, 2),
            Err(NNError::DepthConstraint(_))
        ));
    }

    #[test]
    fn wide_then_narrow_holds_input_width_then_pivots() {
        let widths = WidthPolicy::WideThenNarrow.widths(5, 784, 10).unwrap();
        assert_eq!(widths, vec![784, 784, 784, 784, NARROW_PIVOT_WIDTH, 10]);
    }

    #[test]
    fn wide_then_narrow_needs_three_layers() {
        assert!(WidthPolicy::WideThenNarrow.widths(3, 784, 10).is_ok());
        assert!(matches!(
            WidthPolicy::WideThenNarrow.widths(2, 784, 10),
            Err(NNError::DepthConstraint(_))
        ));
    }

    #[test]
    fn zero_dimensions_are_configuration_errors() {
        assert!(WidthPolicy::LinearShrink.widths(0, 10, 2).is_err());
        assert!(WidthPolicy::LinearShrink.widths(2, 0, 2).is_err());
        assert!(WidthPolicy::LinearShrink.widths(2, 10, 0).is_err());
    }
}
