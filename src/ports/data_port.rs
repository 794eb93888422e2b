//! Bar data access port trait.

use crate::domain::error::TradebenchError;
use crate::domain::num::Num;
use crate::domain::series::BarSeries;
use std::path::Path;

pub trait DataPort<N: Num> {
    /// Loads every bar stored at `path` into a series called `name`, ordered
    /// by begin time.
    fn load_series(&self, path: &Path, name: &str) -> Result<BarSeries<N>, TradebenchError>;
}
