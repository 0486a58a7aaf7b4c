//! Price history access port.

use crate::domain::error::SharpefolioError;
use crate::domain::price::PriceSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Full close-price history for `ticker`.
    fn fetch_prices(&self, ticker: &str) -> Result<PriceSeries, SharpefolioError>;

    fn list_tickers(&self) -> Result<Vec<String>, SharpefolioError>;

    /// First date, last date and row count, or `None` when the ticker has no
    /// rows.
    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SharpefolioError> {
        let series = self.fetch_prices(ticker)?;
        Ok(series
            .date_range()
            .map(|(first, last)| (first, last, series.len())))
    }
}
