use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Minutes assumed for a step that carries no estimate.
pub const DEFAULT_STEP_MINUTES: f32 = 2.0;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Step {
    pub step_number: u32,
    pub category: String,
    #[serde(alias = "instructions")]
    pub instruction: String,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub duration_minutes: Option<f32>,
}

impl Step {
    pub fn new(step_number: u32, category: &str, instruction: &str) -> Self {
        Self {
            step_number,
            category: category.to_string(),
            instruction: instruction.to_string(),
            products: Vec::new(),
            tips: Vec::new(),
            duration_minutes: None,
        }
    }

    /// Text handed to the narrator for this step.
    pub fn narration(&self) -> String {
        format!(
            "Step {}: {}. {}",
            self.step_number, self.category, self.instruction
        )
    }

    pub fn area(&self) -> FaceArea {
        FaceArea::from_category(&self.category)
    }

    pub fn estimated_minutes(&self) -> f32 {
        self.duration_minutes.unwrap_or(DEFAULT_STEP_MINUTES)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FaceArea {
    Base,
    Eyes,
    Cheeks,
    Lips,
    Other,
}

impl FaceArea {
    pub fn from_category(category: &str) -> Self {
        let normalized = category.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "foundation" | "concealer" | "powder" | "primer" => FaceArea::Base,
            "eyeshadow" | "eyeliner" | "kajal" | "mascara" | "eyebrow" => FaceArea::Eyes,
            "blush" | "bronzer" | "highlighter" => FaceArea::Cheeks,
            "lipstick" | "lip_gloss" | "lip_liner" => FaceArea::Lips,
            _ => FaceArea::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FaceArea::Base => "Base",
            FaceArea::Eyes => "Eyes",
            FaceArea::Cheeks => "Cheeks",
            FaceArea::Lips => "Lips",
            FaceArea::Other => "Other",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MakeupPlan {
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub intensity: Option<String>,
    #[serde(default)]
    pub key_focus: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PlanSummary {
    pub step_count: usize,
    pub total_minutes: f32,
    pub products_needed: Vec<String>,
    pub areas: BTreeMap<FaceArea, Vec<u32>>,
}

impl MakeupPlan {
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let plan: MakeupPlan =
            serde_json::from_str(content).context("Failed to parse makeup plan")?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan file {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid plan in {}", path.display()))
    }

    /// Step numbers must run 1..=n in order. An empty plan is valid.
    pub fn validate(&self) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.step_number != expected {
                bail!(
                    "Step at position {} has number {}, expected {}",
                    index + 1,
                    step.step_number,
                    expected
                );
            }
            if let Some(minutes) = step.duration_minutes {
                if !minutes.is_finite() || minutes < 0.0 {
                    bail!(
                        "Step {} has an invalid duration: {}",
                        step.step_number,
                        minutes
                    );
                }
            }
        }
        Ok(())
    }

    pub fn shared_steps(&self) -> Arc<[Step]> {
        Arc::from(self.steps.clone())
    }

    pub fn summary(&self) -> PlanSummary {
        let total_minutes = self.steps.iter().map(Step::estimated_minutes).sum();

        let mut products_needed: Vec<String> = Vec::new();
        for product in self.steps.iter().flat_map(|s| s.products.iter()) {
            if !products_needed.contains(product) {
                products_needed.push(product.clone());
            }
        }

        let mut areas: BTreeMap<FaceArea, Vec<u32>> = BTreeMap::new();
        for step in &self.steps {
            areas.entry(step.area()).or_default().push(step.step_number);
        }

        PlanSummary {
            step_count: self.steps.len(),
            total_minutes,
            products_needed,
            areas,
        }
    }
}
