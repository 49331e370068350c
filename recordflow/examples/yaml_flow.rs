use recordflow::context::RecordflowConfig;
use recordflow::prelude::*;
use serde_json::json;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Logger::init_tracing();
    println!("=== RecordFlow YAML Flow Demo ===\n");

    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("flows/orders.yml");
    let mut flow = Flow::load_with(
        FlowSource::File(&path),
        &TransformationCatalogue::new(),
        &RecordflowConfig::from_env()?,
    )?;
    println!("Flow: {:?}", flow.configuration().description);
    println!("Steps: {:?}\n", flow.configuration().transformation_names());

    flow.process(vec![
        json!({"id": "1", "cust": "acme", "note": "call back 42", "internal": true}),
        json!({"id": "2", "cust": "globex"}),
        json!({"id": 3, "cust": "initech"}),
    ])
    .await?;

    for (name, records) in flow.datasets().iter() {
        println!("Dataset '{}':", name);
        for record in records {
            println!("  {}", record);
        }
    }

    println!("\nFailed records: {}", flow.failed_records().len());
    for failed in flow.failed_records() {
        for record in &failed.failed_records {
            println!("  {} -> {}", failed.init_record, record.error);
        }
    }

    println!("\nStatistics: {:?}", flow.statistics());
    println!("=== Demo Completed ===");
    Ok(())
}
