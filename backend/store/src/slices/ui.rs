use serde::Serialize;
use tessera_config::DateFilterConfigMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    /// Session override of the configured date filter mode.
    pub date_filter_config_mode: Option<DateFilterConfigMode>,
    pub triggered_events: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    SetDateFilterConfigMode(DateFilterConfigMode),
    EventTriggered,
}

pub fn reduce(state: &mut UiState, action: UiAction) {
    match action {
        UiAction::SetDateFilterConfigMode(mode) => state.date_filter_config_mode = Some(mode),
        UiAction::EventTriggered => state.triggered_events += 1,
    }
}
