use recordflow_context::Record;
use recordflow_core::{FailedRecord, FlowPipelineResult};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 一次 `process` 汇总出的输出数据集
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datasets {
    datasets: BTreeMap<String, Vec<Record>>,
}

impl Datasets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one run into the aggregate.
    ///
    /// A successful run appends its datasets, a failed run only contributes
    /// its [`FailedDataset`].
    pub fn merge(&mut self, result: FlowPipelineResult) -> Option<FailedDataset> {
        let run_id = result.state.run_id;
        let init_record = result.state.init_record.clone();
        let (datasets, failed_records) = result.state.into_parts();

        if result.success {
            self.extend(datasets);
            None
        } else {
            tracing::debug!(run_id = %run_id, "Discarding datasets of failed run");
            Some(FailedDataset {
                init_record,
                run_id,
                failed_records,
            })
        }
    }

    pub fn extend(&mut self, datasets: BTreeMap<String, Vec<Record>>) {
        for (name, records) in datasets {
            self.datasets.entry(name).or_default().extend(records);
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Record]> {
        self.datasets.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    /// Number of datasets
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Number of records across all datasets
    pub fn record_count(&self) -> usize {
        self.datasets.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Record])> {
        self.datasets
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn clear(&mut self) {
        self.datasets.clear();
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<Record>> {
        self.datasets
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .datasets
            .iter()
            .map(|(name, records)| {
                let records = records.iter().cloned().map(Value::from).collect();
                (name.clone(), Value::Array(records))
            })
            .collect();
        Value::Object(map)
    }
}

/// 一条输入记录在某次运行中的全部失败
#[derive(Debug, Clone, PartialEq)]
pub struct FailedDataset {
    pub init_record: Record,
    pub run_id: Uuid,
    pub failed_records: Vec<FailedRecord>,
}

impl FailedDataset {
    pub fn to_value(&self) -> Value {
        json!({
            "init_record": self.init_record,
            "run_id": self.run_id.to_string(),
            "failed_records": self
                .failed_records
                .iter()
                .map(FailedRecord::to_value)
                .collect::<Vec<_>>(),
        })
    }
}
