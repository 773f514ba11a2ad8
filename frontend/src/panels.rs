//! Slide-in panel state machine. At most one panel is open; the search box
//! is pushed aside while any panel is open.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Panel {
    List,
    Feature,
    Parcel,
    Guide,
}

impl Panel {
    pub const ALL: [Panel; 4] = [Panel::List, Panel::Feature, Panel::Parcel, Panel::Guide];

    /// Whether opening this panel leaves an open roadview alone.
    pub fn keeps_roadview(self) -> bool {
        !matches!(self, Panel::Guide)
    }

    pub fn title(self) -> &'static str {
        match self {
            Panel::List => "주유소 정보",
            Panel::Feature => "주변 정보",
            Panel::Parcel => "필지 정보",
            Panel::Guide => "이용 안내",
        }
    }
}

/// Side effects the owner must carry out after a transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanelEffects {
    /// Vehicle/EV markers and the buffer circle must go.
    pub clear_feature_layers: bool,
    pub close_roadview: bool,
}

impl PanelEffects {
    fn merge(self, other: PanelEffects) -> PanelEffects {
        PanelEffects {
            clear_feature_layers: self.clear_feature_layers || other.clear_feature_layers,
            close_roadview: self.close_roadview || other.close_roadview,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanelController {
    open: Option<Panel>,
}

impl PanelController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Panel> {
        self.open
    }

    pub fn is_open(&self, panel: Panel) -> bool {
        self.open == Some(panel)
    }

    pub fn any_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn open(&mut self, panel: Panel, keep_roadview: bool) -> PanelEffects {
        let mut effects = self.close_all(!keep_roadview);
        if panel == Panel::List {
            effects.clear_feature_layers = true;
        }
        self.open = Some(panel);
        effects
    }

    pub fn close(&mut self, panel: Panel) -> PanelEffects {
        if self.open != Some(panel) {
            return PanelEffects::default();
        }
        self.open = None;
        PanelEffects {
            clear_feature_layers: panel == Panel::Feature,
            close_roadview: false,
        }
    }

    /// Button behaviour: closes an open panel, opens a closed one.
    pub fn toggle(&mut self, panel: Panel) -> PanelEffects {
        if self.is_open(panel) {
            self.close(panel)
        } else {
            self.open(panel, panel.keeps_roadview())
        }
    }

    pub fn close_all(&mut self, close_roadview: bool) -> PanelEffects {
        let closed = match self.open {
            Some(panel) => self.close(panel),
            None => PanelEffects::default(),
        };
        closed.merge(PanelEffects {
            clear_feature_layers: false,
            close_roadview,
        })
    }

    pub fn panel_class(&self, panel: Panel) -> &'static str {
        if self.is_open(panel) { "panel is-open" } else { "panel" }
    }

    pub fn button_class(&self, panel: Panel) -> &'static str {
        if self.is_open(panel) { "nav-btn active" } else { "nav-btn" }
    }

    pub fn search_box_class(&self) -> &'static str {
        if self.any_open() {
            "search-box pushed-by-list"
        } else {
            "search-box"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_one_panel_closes_the_others() {
        for target in Panel::ALL {
            let mut panels = PanelController::new();
            for other in Panel::ALL {
                panels.open(other, true);
            }
            panels.open(target, true);
            for panel in Panel::ALL {
                assert_eq!(panels.is_open(panel), panel == target);
            }
        }
    }

    #[test]
    fn any_open_is_false_only_when_everything_is_closed() {
        let mut panels = PanelController::new();
        assert!(!panels.any_open());
        panels.open(Panel::Parcel, true);
        assert!(panels.any_open());
        panels.close(Panel::Guide);
        assert!(panels.any_open());
        panels.close(Panel::Parcel);
        assert!(!panels.any_open());
    }

    #[test]
    fn search_box_returns_after_last_close() {
        let mut panels = PanelController::new();
        panels.toggle(Panel::List);
        assert_eq!(panels.search_box_class(), "search-box pushed-by-list");
        assert_eq!(panels.button_class(Panel::List), "nav-btn active");
        panels.toggle(Panel::Feature);
        assert_eq!(panels.search_box_class(), "search-box pushed-by-list");
        panels.toggle(Panel::Feature);
        assert_eq!(panels.search_box_class(), "search-box");
        assert_eq!(panels.panel_class(Panel::Feature), "panel");
        assert_eq!(panels.button_class(Panel::List), "nav-btn");
    }

    #[test]
    fn closing_feature_or_opening_list_clears_feature_layers() {
        let mut panels = PanelController::new();
        assert!(!panels.open(Panel::Feature, true).clear_feature_layers);
        assert!(panels.close(Panel::Feature).clear_feature_layers);

        panels.open(Panel::Feature, true);
        assert!(panels.open(Panel::Parcel, true).clear_feature_layers);

        assert!(panels.open(Panel::List, true).clear_feature_layers);
        assert!(!panels.close(Panel::List).clear_feature_layers);
    }

    #[test]
    fn only_opening_the_guide_closes_the_roadview() {
        let mut panels = PanelController::new();
        assert!(!panels.toggle(Panel::List).close_roadview);
        assert!(panels.toggle(Panel::Guide).close_roadview);
        assert_eq!(panels.toggle(Panel::Guide), PanelEffects::default());
        assert!(!panels.any_open());
        assert!(!panels.toggle(Panel::Parcel).close_roadview);
        panels.open(Panel::Guide, false);
        assert!(!panels.close(Panel::Guide).close_roadview);
    }

    #[test]
    fn close_all_reports_roadview_request() {
        let mut panels = PanelController::new();
        panels.open(Panel::Feature, true);
        let effects = panels.close_all(true);
        assert_eq!(
            effects,
            PanelEffects {
                clear_feature_layers: true,
                close_roadview: true
            }
        );
        assert!(!panels.any_open());
        assert_eq!(panels.close(Panel::List), PanelEffects::default());
    }
}
