//! # Flow Fail Scenarios
//!
//! 所有记录处理完成后的整体失败策略。阈值类场景在 `threshold <= value` 时
//! 触发, 数据集类场景按数据集是否存在触发。场景按配置顺序检查。

use crate::dataset::Datasets;
use crate::statistics::FlowStatistics;
use serde_json::Value;
use thiserror::Error;

pub const PERCENTAGE_OF_FAILED_RECORDS: &str = "percentage_of_failed_records";
pub const NUMBER_OF_FAILED_RECORDS: &str = "number_of_failed_records";
pub const DATASETS_PRESENT: &str = "datasets_present";
pub const DATASETS_NOT_PRESENT: &str = "datasets_not_present";

/// 场景配置错误, 构造时即报告
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailScenarioError {
    #[error("Unknown fail scenario '{0}'")]
    Unknown(String),

    #[error("Fail scenario '{scenario}' is not properly defined: {reason}")]
    Invalid { scenario: String, reason: String },
}

/// 场景被触发
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowFailError {
    #[error("Flow Fail Scenario '{scenario}': Threshold defined as {threshold}, got {value}")]
    Threshold {
        scenario: &'static str,
        threshold: usize,
        value: usize,
    },

    #[error("Flow Fail Scenario 'datasets_present': Dataset '{0}' is present")]
    DatasetPresent(String),

    #[error("Flow Fail Scenario 'datasets_not_present': Dataset '{0}' is not present")]
    DatasetNotPresent(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailScenario {
    PercentageOfFailedRecords(usize),
    NumberOfFailedRecords(usize),
    DatasetsPresent(Vec<String>),
    DatasetsNotPresent(Vec<String>),
}

impl FailScenario {
    /// Build a scenario from its configuration name and value
    pub fn from_config(choice: &str, value: &Value) -> Result<Self, FailScenarioError> {
        let scenario = match choice {
            PERCENTAGE_OF_FAILED_RECORDS => {
                Self::PercentageOfFailedRecords(integer(choice, value)?)
            }
            NUMBER_OF_FAILED_RECORDS => Self::NumberOfFailedRecords(integer(choice, value)?),
            DATASETS_PRESENT => Self::DatasetsPresent(names(choice, value)?),
            DATASETS_NOT_PRESENT => Self::DatasetsNotPresent(names(choice, value)?),
            other => return Err(FailScenarioError::Unknown(other.to_string())),
        };
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PercentageOfFailedRecords(_) => PERCENTAGE_OF_FAILED_RECORDS,
            Self::NumberOfFailedRecords(_) => NUMBER_OF_FAILED_RECORDS,
            Self::DatasetsPresent(_) => DATASETS_PRESENT,
            Self::DatasetsNotPresent(_) => DATASETS_NOT_PRESENT,
        }
    }

    pub fn validate(&self) -> Result<(), FailScenarioError> {
        let invalid = |reason: &str| {
            Err(FailScenarioError::Invalid {
                scenario: self.name().to_string(),
                reason: reason.to_string(),
            })
        };
        match self {
            Self::PercentageOfFailedRecords(threshold) if !(1..=100).contains(threshold) => {
                invalid("percentage has to be between 1 and 100")
            }
            Self::DatasetsPresent(datasets) | Self::DatasetsNotPresent(datasets)
                if datasets.is_empty() =>
            {
                invalid("at least one dataset has to be defined")
            }
            _ => Ok(()),
        }
    }

    pub fn check(
        &self,
        statistics: &FlowStatistics,
        datasets: &Datasets,
    ) -> Result<(), FlowFailError> {
        let threshold_check = |threshold: usize, value: usize| {
            if threshold <= value {
                Err(FlowFailError::Threshold {
                    scenario: self.name(),
                    threshold,
                    value,
                })
            } else {
                Ok(())
            }
        };

        match self {
            Self::PercentageOfFailedRecords(threshold) => {
                threshold_check(*threshold, statistics.percentage_of_failed_records)
            }
            Self::NumberOfFailedRecords(threshold) => {
                threshold_check(*threshold, statistics.failed_records)
            }
            Self::DatasetsPresent(names) => match names.iter().find(|name| datasets.contains(name)) {
                Some(name) => Err(FlowFailError::DatasetPresent(name.clone())),
                None => Ok(()),
            },
            Self::DatasetsNotPresent(names) => {
                match names.iter().find(|name| !datasets.contains(name)) {
                    Some(name) => Err(FlowFailError::DatasetNotPresent(name.clone())),
                    None => Ok(()),
                }
            }
        }
    }
}

fn integer(choice: &str, value: &Value) -> Result<usize, FailScenarioError> {
    value
        .as_u64()
        .and_then(|number| usize::try_from(number).ok())
        .ok_or_else(|| FailScenarioError::Invalid {
            scenario: choice.to_string(),
            reason: format!("expected a non negative integer, got {}", value),
        })
}

fn names(choice: &str, value: &Value) -> Result<Vec<String>, FailScenarioError> {
    let invalid = || FailScenarioError::Invalid {
        scenario: choice.to_string(),
        reason: format!("expected a list of dataset names, got {}", value),
    };
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|name| name.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

/// 按配置顺序排列的失败场景
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowFailScenario {
    scenarios: Vec<FailScenario>,
}

impl FlowFailScenario {
    pub fn new(scenarios: Vec<FailScenario>) -> Result<Self, FailScenarioError> {
        for scenario in &scenarios {
            scenario.validate()?;
        }
        Ok(Self { scenarios })
    }

    /// Build from `(choice, value)` pairs, keeping their order
    pub fn from_config<'a, I>(entries: I) -> Result<Self, FailScenarioError>
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let scenarios = entries
            .into_iter()
            .map(|(choice, value)| FailScenario::from_config(choice, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { scenarios })
    }

    pub fn scenarios(&self) -> &[FailScenario] {
        &self.scenarios
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Every violated scenario, in configuration order
    pub fn violations(
        &self,
        statistics: &FlowStatistics,
        datasets: &Datasets,
    ) -> Vec<FlowFailError> {
        self.scenarios
            .iter()
            .filter_map(|scenario| scenario.check(statistics, datasets).err())
            .collect()
    }

    /// Fail with the first violated scenario; all violations are logged
    pub fn evaluate(
        &self,
        statistics: &FlowStatistics,
        datasets: &Datasets,
    ) -> Result<(), FlowFailError> {
        let mut violations = self.violations(statistics, datasets).into_iter();
        let Some(first) = violations.next() else {
            return Ok(());
        };

        tracing::error!(error = %first, "Flow fail scenario triggered");
        for violation in violations {
            tracing::error!(error = %violation, "Flow fail scenario triggered");
        }
        Err(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn statistics(input: usize, failed: usize, percentage: usize) -> FlowStatistics {
        FlowStatistics {
            input_records: input,
            output_datasets: 0,
            failed_records: failed,
            percentage_of_failed_records: percentage,
        }
    }

    fn datasets(names: &[&str]) -> Datasets {
        let mut datasets = Datasets::new();
        datasets.extend(
            names
                .iter()
                .map(|name| (name.to_string(), Vec::new()))
                .collect::<BTreeMap<_, _>>(),
        );
        datasets
    }

    #[test]
    fn test_percentage_threshold_is_inclusive() {
        let scenario =
            FailScenario::from_config(PERCENTAGE_OF_FAILED_RECORDS, &json!(50)).unwrap();
        let err = scenario.check(&statistics(2, 1, 50), &Datasets::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Flow Fail Scenario 'percentage_of_failed_records': Threshold defined as 50, got 50"
        );
        assert!(scenario.check(&statistics(3, 1, 33), &Datasets::new()).is_ok());
    }

    #[test]
    fn test_number_threshold() {
        let scenario = FailScenario::from_config(NUMBER_OF_FAILED_RECORDS, &json!(0)).unwrap();
        assert!(scenario.check(&statistics(1, 0, 0), &Datasets::new()).is_err());

        let scenario = FailScenario::NumberOfFailedRecords(2);
        assert!(scenario.check(&statistics(4, 1, 25), &Datasets::new()).is_ok());
    }

    #[test]
    fn test_dataset_scenarios() {
        let present = FailScenario::DatasetsPresent(vec!["x".into(), "y".into()]);
        assert_eq!(
            present.check(&statistics(0, 0, 0), &datasets(&["y"])).unwrap_err(),
            FlowFailError::DatasetPresent("y".into())
        );
        assert!(present.check(&statistics(0, 0, 0), &datasets(&["z"])).is_ok());

        let not_present = FailScenario::DatasetsNotPresent(vec!["x".into()]);
        assert_eq!(
            not_present.check(&statistics(0, 0, 0), &datasets(&[])).unwrap_err().to_string(),
            "Flow Fail Scenario 'datasets_not_present': Dataset 'x' is not present"
        );
    }

    #[test]
    fn test_invalid_configuration() {
        for (choice, value) in [
            (PERCENTAGE_OF_FAILED_RECORDS, json!(0)),
            (PERCENTAGE_OF_FAILED_RECORDS, json!(101)),
            (PERCENTAGE_OF_FAILED_RECORDS, json!(12.5)),
            (NUMBER_OF_FAILED_RECORDS, json!(-1)),
            (DATASETS_PRESENT, json!([])),
            (DATASETS_NOT_PRESENT, json!("x")),
        ] {
            assert!(
                matches!(
                    FailScenario::from_config(choice, &value),
                    Err(FailScenarioError::Invalid { .. })
                ),
                "{} = {} should be rejected",
                choice,
                value
            );
        }
        assert_eq!(
            FailScenario::from_config("unknown", &json!(1)),
            Err(FailScenarioError::Unknown("unknown".into()))
        );
        assert!(FlowFailScenario::new(vec![FailScenario::DatasetsPresent(vec![])]).is_err());
    }

    #[test]
    fn test_first_violation_wins() {
        let present = json!(["a"]);
        let number = json!(1);
        let stats = statistics(2, 1, 50);
        let datasets = datasets(&["a"]);

        let scenarios = FlowFailScenario::from_config(vec![
            (DATASETS_PRESENT, &present),
            (NUMBER_OF_FAILED_RECORDS, &number),
        ])
        .unwrap();
        assert_eq!(scenarios.violations(&stats, &datasets).len(), 2);
        assert_eq!(
            scenarios.evaluate(&stats, &datasets).unwrap_err(),
            FlowFailError::DatasetPresent("a".into())
        );

        let reordered = FlowFailScenario::from_config(vec![
            (NUMBER_OF_FAILED_RECORDS, &number),
            (DATASETS_PRESENT, &present),
        ])
        .unwrap();
        assert!(matches!(
            reordered.evaluate(&stats, &datasets),
            Err(FlowFailError::Threshold { threshold: 1, value: 1, .. })
        ));
    }
}
