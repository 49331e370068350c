use crate::dataset::{Datasets, FailedDataset};
use serde::Serialize;

/// 处理前后各计算一次的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlowStatistics {
    pub input_records: usize,
    pub output_datasets: usize,
    /// Number of input records whose run failed
    pub failed_records: usize,
    pub percentage_of_failed_records: usize,
}

impl FlowStatistics {
    pub fn calculate(
        input_records: usize,
        datasets: &Datasets,
        failed: &[FailedDataset],
    ) -> Self {
        Self {
            input_records,
            output_datasets: datasets.len(),
            failed_records: failed.len(),
            percentage_of_failed_records: percentage(failed.len(), input_records),
        }
    }
}

// 四舍六入五取偶, 整数运算避免浮点误差
fn percentage(part: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let scaled = part * 100;
    let quotient = scaled / total;
    let twice_remainder = 2 * (scaled % total);
    if twice_remainder > total || (twice_remainder == total && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 12);
        assert_eq!(percentage(3, 8), 38);
        assert_eq!(percentage(4, 4), 100);
    }

    #[test]
    fn test_calculate_before_processing() {
        let statistics = FlowStatistics::calculate(5, &Datasets::new(), &[]);
        assert_eq!(
            statistics,
            FlowStatistics {
                input_records: 5,
                output_datasets: 0,
                failed_records: 0,
                percentage_of_failed_records: 0,
            }
        );
    }
}
