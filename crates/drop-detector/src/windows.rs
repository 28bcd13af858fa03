use chrono::{Datelike, Duration, NaiveDate, Weekday};
use scanner_core::{DateRange, PricePoint};

/// The two adjacent windows carved from the tail of a series
#[derive(Debug, Clone, Copy)]
pub struct ScanWindows<'a> {
    pub stability: &'a [PricePoint],
    pub drop: &'a [PricePoint],
}

impl<'a> ScanWindows<'a> {
    /// Split the most recent `stable + drop` points. `None` if there are too few.
    pub fn split(points: &'a [PricePoint], stable: usize, drop: usize) -> Option<Self> {
        if stable == 0 || drop == 0 || points.len() < stable + drop {
            return None;
        }
        let tail = &points[points.len() - (stable + drop)..];
        let (stability, drop) = tail.split_at(stable);
        Some(Self { stability, drop })
    }

    pub fn stability_range(&self) -> DateRange {
        range_of(self.stability)
    }

    pub fn drop_range(&self) -> DateRange {
        range_of(self.drop)
    }

    /// Last close of the stability window
    pub fn reference_price(&self) -> f64 {
        self.stability[self.stability.len() - 1].close
    }

    pub fn current_price(&self) -> f64 {
        self.drop[self.drop.len() - 1].close
    }

    pub fn stability_closes(&self) -> Vec<f64> {
        self.stability.iter().map(|p| p.close).collect()
    }

    pub fn drop_closes(&self) -> Vec<f64> {
        self.drop.iter().map(|p| p.close).collect()
    }

    /// First pair of consecutive dates, from the reference day through the drop window,
    /// with more than `max_missing` weekdays between them. Weekends never count, so a
    /// three-day exchange holiday passes a tolerance of 3.
    pub fn find_gap(&self, max_missing: u32) -> Option<(NaiveDate, NaiveDate)> {
        let reference = &self.stability[self.stability.len() - 1];
        std::iter::once(reference)
            .chain(self.drop.iter())
            .collect::<Vec<_>>()
            .windows(2)
            .find(|w| missing_weekdays(w[0].date, w[1].date) > max_missing)
            .map(|w| (w[0].date, w[1].date))
    }

    /// A drop-window day that traded zero volume (halted)
    pub fn find_halt(&self) -> Option<NaiveDate> {
        self.drop
            .iter()
            .find(|p| matches!(p.volume, Some(v) if v == 0.0))
            .map(|p| p.date)
    }
}

/// Mon-Fri dates strictly between `from` and `to`
pub fn missing_weekdays(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut count = 0;
    let mut day = from + Duration::days(1);
    while day < to {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            count += 1;
        }
        day += Duration::days(1);
    }
    count
}

fn range_of(points: &[PricePoint]) -> DateRange {
    DateRange {
        start: points[0].date,
        end: points[points.len() - 1].date,
    }
}

/// Bucket returns across the drop window, chained from the reference close.
///
/// Closes are split into consecutive buckets of `bucket_days` (the last may be
/// shorter). Each return runs from the previous bucket's last close to this bucket's
/// last close; the first bucket starts at `reference`.
pub fn weekly_bucket_returns(reference: f64, closes: &[f64], bucket_days: usize) -> Vec<f64> {
    if bucket_days == 0 || reference <= 0.0 {
        return Vec::new();
    }

    let mut previous = reference;
    closes
        .chunks(bucket_days)
        .filter_map(|bucket| bucket.last().copied())
        .map(|end| {
            let r = end / previous - 1.0;
            previous = end;
            r
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn points(closes: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint::new(start + chrono::Duration::days(i as i64), *c))
            .collect()
    }

    #[test]
    fn test_split_takes_tail() {
        let pts = points(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let w = ScanWindows::split(&pts, 3, 2).unwrap();
        assert_eq!(w.stability_closes(), vec![2.0, 3.0, 4.0]);
        assert_eq!(w.drop_closes(), vec![5.0, 6.0]);
        assert_eq!(w.reference_price(), 4.0);
        assert_eq!(w.current_price(), 6.0);
        assert!(ScanWindows::split(&pts, 5, 2).is_none());
    }

    #[test]
    fn test_bucket_returns_chain_from_reference() {
        let closes = [95.0, 94.0, 93.0, 92.0, 90.0, 85.0, 80.0, 79.2];
        let returns = weekly_bucket_returns(100.0, &closes, 5);
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], -0.10, epsilon = 1e-12);
        assert_relative_eq!(returns[1], -0.12, epsilon = 1e-12);
    }

    #[test]
    fn test_bucket_returns_short_last_bucket() {
        let closes = [100.0; 21];
        let returns = weekly_bucket_returns(100.0, &closes, 5);
        assert_eq!(returns.len(), 5);
        assert!(returns.iter().all(|r| *r == 0.0));
    }

    #[test]
    fn test_find_gap_includes_transition_from_reference() {
        let mut pts = points(&[10.0, 10.0, 10.0, 9.0, 8.0]);
        // Fri Jan 3 -> Sun Jan 12 skips Jan 6-10
        pts[3].date = pts[2].date + chrono::Duration::days(9);
        pts[4].date = pts[3].date + chrono::Duration::days(1);
        let w = ScanWindows::split(&pts, 3, 2).unwrap();
        assert_eq!(w.find_gap(4), Some((pts[2].date, pts[3].date)));
        assert_eq!(w.find_gap(5), None);
    }

    #[test]
    fn test_missing_weekdays_ignores_weekends() {
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).unwrap();
        // Fri -> Mon
        assert_eq!(missing_weekdays(d(6, 6), d(6, 9)), 0);
        assert_eq!(missing_weekdays(d(6, 9), d(6, 10)), 0);
        assert_eq!(missing_weekdays(d(6, 9), d(6, 9)), 0);
        // Tue Dec 23 -> Mon Dec 29 around Christmas
        assert_eq!(missing_weekdays(d(12, 23), d(12, 29)), 3);
        assert_eq!(missing_weekdays(d(6, 2), d(6, 16)), 9);
    }
}
