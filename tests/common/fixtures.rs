//! Test fixtures and data generators

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Registry version resource as returned by the model listing
pub fn version_resource(version: u32, stage: Option<&str>, run_id: Option<&str>) -> serde_json::Value {
    let mut tags = serde_json::Map::new();
    if let Some(stage) = stage {
        tags.insert("stage".to_string(), json!(stage));
    }
    let mut properties = serde_json::Map::new();
    if let Some(run_id) = run_id {
        properties.insert("mlflow.runId".to_string(), json!(run_id));
    }
    json!({
        "name": version.to_string(),
        "properties": {
            "tags": tags,
            "properties": properties,
            "modelType": "custom_model",
            "modelUri": format!("azureml://datastores/workspaceblobstore/paths/v{}/", version),
            "isArchived": false
        },
        "systemData": {"createdAt": "2024-01-01T00:00:00Z"}
    })
}

/// Noisy insurance-like data where smokers over 40 and high BMI are likely claims
pub fn write_insurance_csv(dir: &Path, rows: usize, seed: u64) -> PathBuf {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut csv = String::from("id,age,sex,bmi,children,smoker,region_code,target\n");
    for id in 0..rows {
        let age: u32 = rng.gen_range(18..65);
        let bmi: f64 = rng.gen_range(16.0..45.0);
        let smoker = rng.gen_bool(0.3);
        let children: u32 = rng.gen_range(0..5);
        let risk = if smoker { 1.5 } else { 0.0 } + (age as f64 - 40.0) / 10.0 + (bmi - 30.0) / 5.0;
        let noise: f64 = rng.gen_range(-1.0..1.0);
        let target = u8::from(risk + noise > 0.5);
        // Occasional missing BMI exercises NaN routing.
        let bmi_cell = if id % 37 == 0 {
            "NA".to_string()
        } else {
            format!("{:.2}", bmi)
        };
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{},{}",
            id,
            age,
            rng.gen_range(0..2),
            bmi_cell,
            children,
            smoker,
            rng.gen_range(0..4),
            target
        );
    }
    let path = dir.join("insurance.csv");
    std::fs::write(&path, csv).expect("Failed to write dataset");
    path
}

/// Parameter file in the shape the trainer expects
pub fn write_parameters(dir: &Path) -> PathBuf {
    let path = dir.join("training_parameters.json");
    std::fs::write(
        &path,
        json!({
            "training": {
                "objective": "binary",
                "n_estimators": 60,
                "learning_rate": 0.1,
                "num_leaves": 15,
                "min_child_samples": 10,
                "subsample": 0.9,
                "colsample_bytree": 0.9,
                "random_state": 7,
                "verbose": -1
            }
        })
        .to_string(),
    )
    .expect("Failed to write parameters");
    path
}
