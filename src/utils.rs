#[allow(unused)]
use crate::prelude::*;

#[macro_export]
macro_rules! gauss_array {
    ($r:expr, $c:expr, $dist:expr) => {
        {
            Array2::random(($r, $c), $dist)
        }
    };
}
