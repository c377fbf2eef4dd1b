use std::collections::BTreeMap;

use plotly::common::Orientation;
use plotly::layout::{Axis, Layout};
use plotly::{Bar, Plot};

use crate::evaluation::FeatureImportance;

/// Bar chart of the number of samples per class.
pub fn plot_class_distribution(
    counts: &BTreeMap<i32, usize>,
    class_name: impl Fn(i32) -> String,
    title: &str,
) -> Plot {
    let names: Vec<String> = counts.keys().map(|&c| class_name(c)).collect();
    let values: Vec<usize> = counts.values().copied().collect();

    let trace = Bar::new(names, values).name("Count");
    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Class"))
        .y_axis(Axis::new().title("Count"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

/// Horizontal bar chart of ranked importances, most important on top.
pub fn plot_feature_importances(importances: &[FeatureImportance], title: &str) -> Plot {
    // plotly draws the first category at the bottom
    let features: Vec<String> = importances.iter().rev().map(|f| f.feature.clone()).collect();
    let values: Vec<f32> = importances.iter().rev().map(|f| f.importance).collect();

    let trace = Bar::new(values, features)
        .orientation(Orientation::Horizontal)
        .name("Importance");
    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Importance"))
        .y_axis(Axis::new().title("Feature"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_plot_lists_top_feature_last() {
        let imp = vec![
            FeatureImportance {
                feature: "bilirubin".into(),
                importance: 0.6,
            },
            FeatureImportance {
                feature: "albumin".into(),
                importance: 0.4,
            },
        ];
        let json = plot_feature_importances(&imp, "Top features").to_json();
        let albumin = json.find("albumin").unwrap();
        let bilirubin = json.find("bilirubin").unwrap();
        assert!(albumin < bilirubin);
        assert!(json.contains("\"orientation\":\"h\""));
    }

    #[test]
    fn class_distribution_uses_names() {
        let counts = BTreeMap::from([(0, 80usize), (1, 15), (2, 5)]);
        let json = plot_class_distribution(&counts, |c| format!("stage {}", c + 1), "Classes").to_json();
        assert!(json.contains("stage 3"));
    }
}
