use crate::dataset::COL_HUMIDITY;
use polars::prelude::{col, lit, LazyFrame};

/// Relative humidity above this is physically implausible.
pub const MAX_HUMIDITY: f64 = 100.0;

pub trait SurveyFrameFilterExt {
    /// Keeps rows whose humidity is at most `limit` (inclusive).
    ///
    /// Rows with a null humidity (cities that were not found) drop out as well.
    fn filter_humidity_at_most(self, limit: f64) -> LazyFrame;

    /// Selects the rows whose humidity is above `limit`.
    fn humidity_outliers(self, limit: f64) -> LazyFrame;

    /// Keeps rows where every one of `columns` is non-null.
    fn drop_missing(self, columns: &[&str]) -> LazyFrame;
}

impl SurveyFrameFilterExt for LazyFrame {
    fn filter_humidity_at_most(self, limit: f64) -> LazyFrame {
        self.filter(col(COL_HUMIDITY).lt_eq(lit(limit)))
    }

    fn humidity_outliers(self, limit: f64) -> LazyFrame {
        self.filter(col(COL_HUMIDITY).gt(lit(limit)))
    }

    fn drop_missing(self, columns: &[&str]) -> LazyFrame {
        let predicate = columns
            .iter()
            .map(|name| col(*name).is_not_null())
            .reduce(|acc, next| acc.and(next));
        match predicate {
            Some(predicate) => self.filter(predicate),
            None => self,
        }
    }
}
