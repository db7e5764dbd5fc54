//! Progress stepper, derived from the current step alone.

use crate::types::WizardStep;
use serde::Serialize;

/// How a step is drawn in the stepper
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StepStatus {
    /// Before the current step
    Completed,
    /// The current step
    Active,
    /// After the current step
    Pending,
}

/// One entry of the stepper
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StepProgress {
    /// The step
    pub step: WizardStep,
    /// 1-based position
    pub number: u8,
    /// Label
    pub label: &'static str,
    /// Status relative to the current step
    pub status: StepStatus,
}

/// All seven steps with their status
#[must_use]
pub fn progress(current: WizardStep) -> Vec<StepProgress> {
    WizardStep::ALL
        .iter()
        .map(|&step| StepProgress {
            step,
            number: step.number(),
            label: step.label(),
            status: match step.cmp(&current) {
                std::cmp::Ordering::Less => StepStatus::Completed,
                std::cmp::Ordering::Equal => StepStatus::Active,
                std::cmp::Ordering::Greater => StepStatus::Pending,
            },
        })
        .collect()
}

/// Fill of the progress bar: 0.0 on step 1, 1.0 on step 7
#[must_use]
pub fn completion_ratio(current: WizardStep) -> f64 {
    let last = f64::from(WizardStep::Success.number() - 1);
    f64::from(current.number() - 1) / last
}

/// One-line text rendering, e.g. `✓ Thông Tin › ● Thời Gian › ○ Chọn Bàn`
#[must_use]
pub fn render(current: WizardStep) -> String {
    progress(current)
        .iter()
        .map(|entry| {
            let mark = match entry.status {
                StepStatus::Completed => '✓',
                StepStatus::Active => '●',
                StepStatus::Pending => '○',
            };
            format!("{mark} {}", entry.label)
        })
        .collect::<Vec<_>>()
        .join(" › ")
}
