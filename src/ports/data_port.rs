//! Data access port trait.

use crate::domain::error::SwingError;
use crate::domain::price::PricePoint;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars ascending by date with unique dates, restricted to the
    /// inclusive `[start_date, end_date]` range when either bound is given.
    fn load_prices(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PricePoint>, SwingError>;
}
