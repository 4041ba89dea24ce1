//! Maintenance recommendations per diagnosed fault.

use crate::domain::FaultLabel;

const TREND_CHECK: &str =
    "Compare this curve with earlier measurements of the same module to track performance trends";

/// Maps a diagnosis to an ordered list of maintenance actions
#[derive(Debug, Clone)]
pub struct Recommender {
    /// Degradation below this fill factor is treated as severe
    severe_fill_factor: f64,
}

impl Default for Recommender {
    fn default() -> Self {
        Self {
            severe_fill_factor: 0.5,
        }
    }
}

impl Recommender {
    pub fn new(severe_fill_factor: f64) -> Self {
        Self { severe_fill_factor }
    }

    pub fn recommend(&self, fault: FaultLabel, fill_factor: f64) -> Vec<String> {
        let specific: &[&str] = match fault {
            FaultLabel::Normal => &[
                "Module is operating normally",
                "Continue routine monitoring and scheduled cleaning",
            ],
            FaultLabel::PartialShading => &[
                "Inspect the array for shading from vegetation, structures or debris",
                "Check that bypass diodes conduct under the shaded substring",
                "Consider relocating or trimming obstructions if the shading recurs",
            ],
            FaultLabel::Soiling => &[
                "Clean the module surface",
                "Re-measure the curve after cleaning to confirm current recovery",
                "Increase the cleaning interval if soiling builds up quickly at this site",
            ],
            FaultLabel::Degradation if fill_factor < self.severe_fill_factor => &[
                "Severe degradation: schedule module replacement",
                "Check the warranty status with the manufacturer",
                "Inspect for delamination, discoloration or cracked cells",
            ],
            FaultLabel::Degradation => &[
                "Moderate degradation: increase the monitoring frequency",
                "Inspect for early signs of delamination or discoloration",
            ],
            FaultLabel::SeriesResistance => &[
                "Inspect connectors, cables and junction box for corrosion or loose contacts",
                "Check solder bonds and cell interconnects for damage",
                "Measure the string resistance and compare with the datasheet",
            ],
            FaultLabel::ShuntResistance => &[
                "Inspect cells for cracks or hot spots with an infrared camera",
                "Check insulation resistance for leakage paths",
                "Replace the module if the leakage keeps increasing",
            ],
            FaultLabel::BypassDiodeFailure => &[
                "Test the bypass diodes in the junction box",
                "Replace failed diodes before hot spots damage the cells",
                "Check the junction box for overheating",
            ],
        };

        specific
            .iter()
            .copied()
            .chain(std::iter::once(TREND_CHECK))
            .map(String::from)
            .collect()
    }
}
