//! Prediction and key driver analysis results, one per widget.

use serde::Serialize;
use tessera_core::{KeyDriverAnalysisResult, ObjRef, PredictionResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsState {
    pub predictions: Vec<PredictionResult>,
    pub key_driver_analyses: Vec<KeyDriverAnalysisResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsAction {
    UpsertPrediction(PredictionResult),
    UpsertKeyDriverAnalysis(KeyDriverAnalysisResult),
    ClearWidget(ObjRef),
}

pub fn reduce(state: &mut AnalyticsState, action: AnalyticsAction) {
    match action {
        AnalyticsAction::UpsertPrediction(result) => {
            state.predictions.retain(|p| p.widget_ref != result.widget_ref);
            state.predictions.push(result);
        }
        AnalyticsAction::UpsertKeyDriverAnalysis(result) => {
            state
                .key_driver_analyses
                .retain(|k| k.widget_ref != result.widget_ref);
            state.key_driver_analyses.push(result);
        }
        AnalyticsAction::ClearWidget(widget) => {
            state.predictions.retain(|p| p.widget_ref != widget);
            state.key_driver_analyses.retain(|k| k.widget_ref != widget);
        }
    }
}

pub fn prediction_for<'a>(state: &'a AnalyticsState, widget: &ObjRef) -> Option<&'a PredictionResult> {
    state.predictions.iter().find(|p| &p.widget_ref == widget)
}

pub fn key_driver_analysis_for<'a>(
    state: &'a AnalyticsState,
    widget: &ObjRef,
) -> Option<&'a KeyDriverAnalysisResult> {
    state.key_driver_analyses.iter().find(|k| &k.widget_ref == widget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn prediction(widget: &str, points: Vec<f64>) -> PredictionResult {
        PredictionResult {
            widget_ref: ObjRef::id(widget),
            horizon: points.len() as u32,
            points,
            confidence: None,
        }
    }

    #[test]
    fn test_prediction_last_write_wins() {
        let mut state = AnalyticsState::default();
        reduce(&mut state, AnalyticsAction::UpsertPrediction(prediction("w1", vec![1.0])));
        reduce(&mut state, AnalyticsAction::UpsertPrediction(prediction("w2", vec![5.0])));
        reduce(&mut state, AnalyticsAction::UpsertPrediction(prediction("w1", vec![2.0, 3.0])));

        assert_eq!(state.predictions.len(), 2);
        assert_eq!(
            prediction_for(&state, &ObjRef::id("w1")),
            Some(&prediction("w1", vec![2.0, 3.0]))
        );
    }

    #[test]
    fn test_clear_widget() {
        let mut state = AnalyticsState::default();
        reduce(&mut state, AnalyticsAction::UpsertPrediction(prediction("w1", vec![1.0])));
        reduce(&mut state, AnalyticsAction::ClearWidget(ObjRef::id("w1")));
        assert!(state.predictions.is_empty());
    }
}
