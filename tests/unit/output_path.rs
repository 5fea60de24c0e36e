//! Monthly chunking of export ranges

use chrono::NaiveDate;
use fitbit_export::output::{split_into_month_ranges, ExportPaths};
use fitbit_export::DateRange;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
    DateRange::new(start, end).unwrap()
}

#[test]
fn test_chunks_cover_range_without_gaps() {
    let requested = range(date(2022, 11, 20), date(2023, 5, 3));
    let chunks = split_into_month_ranges(&requested);

    assert_eq!(chunks.first().unwrap().start(), requested.start());
    assert_eq!(chunks.last().unwrap().end(), requested.end());
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].end().succ_opt().unwrap(), pair[1].start());
    }
    let days: i64 = chunks.iter().map(DateRange::num_days).sum();
    assert_eq!(days, requested.num_days());
    // Every chunk fits the weight endpoint window
    assert!(chunks.iter().all(|chunk| chunk.num_days() <= 31));
}

#[test]
fn test_single_day_range() {
    let chunks = split_into_month_ranges(&range(date(2023, 6, 30), date(2023, 6, 30)));
    assert_eq!(chunks, vec![range(date(2023, 6, 30), date(2023, 6, 30))]);
}

#[test]
fn test_paths_follow_cache_layout() {
    let paths = ExportPaths::new(".cache", "f2g");
    assert_eq!(paths.auth_file(), std::path::Path::new(".cache/.auth"));
    assert_eq!(paths.lock_file(), std::path::Path::new(".cache/.lock"));
    assert_eq!(
        paths.output_file("weight.2023-01-01:2023-01-31.csv"),
        std::path::Path::new("f2g/weight.2023-01-01:2023-01-31.csv")
    );
}
