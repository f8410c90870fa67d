//! Tool state machine. Pointer handlers return [`Action`]s for the host to
//! carry out; nothing here touches the network.

use portal_types::{Markup, Point};
use uuid::Uuid;

use crate::canvas::hit_test_pin;
use crate::geometry::{DEFAULT_COLOR, DEFAULT_STROKE_WIDTH, MAX_STROKE_WIDTH, MIN_STROKE_WIDTH, Path};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Select,
    Comment,
    Draw,
    Highlight,
    Rectangle,
    Circle,
    Arrow,
}

impl Tool {
    pub const ALL: [Tool; 7] = [
        Tool::Select,
        Tool::Comment,
        Tool::Draw,
        Tool::Highlight,
        Tool::Rectangle,
        Tool::Circle,
        Tool::Arrow,
    ];

    /// Highlight and the shape tools can be selected but do nothing yet.
    pub fn is_implemented(self) -> bool {
        matches!(self, Tool::Select | Tool::Comment | Tool::Draw)
    }

    pub fn label(self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Comment => "Comment",
            Tool::Draw => "Draw",
            Tool::Highlight => "Highlight",
            Tool::Rectangle => "Rectangle",
            Tool::Circle => "Circle",
            Tool::Arrow => "Arrow",
        }
    }
}

/// What the host should do after an input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Show the comment composer anchored at a canvas point.
    OpenComposer { at: Point },
    /// A finished stroke ready to be persisted.
    CommitPath(Path),
    HoverChanged {
        markup_id: Option<Uuid>,
        anchor: Option<Point>,
    },
    RenderNeeded,
}

#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    Drawing(Path),
}

#[derive(Debug, Clone)]
pub struct ToolState {
    tool: Tool,
    color: String,
    stroke_width: u8,
    gesture: Gesture,
    composer_at: Option<Point>,
    hovered: Option<Uuid>,
    tooltip_anchor: Option<Point>,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            tool: Tool::default(),
            color: DEFAULT_COLOR.to_string(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            gesture: Gesture::Idle,
            composer_at: None,
            hovered: None,
            tooltip_anchor: None,
        }
    }
}

impl ToolState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn stroke_width(&self) -> u8 {
        self.stroke_width
    }

    pub fn active_path(&self) -> Option<&Path> {
        match &self.gesture {
            Gesture::Drawing(path) => Some(path),
            Gesture::Idle => None,
        }
    }

    pub fn hovered(&self) -> Option<Uuid> {
        self.hovered
    }

    pub fn tooltip_anchor(&self) -> Option<Point> {
        self.tooltip_anchor
    }

    /// Where the open comment composer is anchored, if one is open.
    pub fn composer_anchor(&self) -> Option<Point> {
        self.composer_at
    }

    pub fn take_composer(&mut self) -> Option<Point> {
        self.composer_at.take()
    }

    // --- Settings ---

    /// Switch tools. Leaving `Draw` mid-drag throws the stroke away.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        let mut actions = Vec::new();
        if tool == self.tool {
            return actions;
        }

        if matches!(self.gesture, Gesture::Drawing(_)) {
            self.gesture = Gesture::Idle;
            actions.push(Action::RenderNeeded);
        }
        self.composer_at = None;
        if self.tool == Tool::Select {
            actions.extend(self.clear_hover());
        }
        self.tool = tool;
        actions
    }

    /// Applies to the next stroke or pin only.
    pub fn set_color(&mut self, color: &str) {
        self.color = color.to_string();
    }

    /// Clamped to 1..=20. Applies to the next stroke only.
    pub fn set_stroke_width(&mut self, width: u8) {
        self.stroke_width = width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH);
    }

    pub fn clear_hover(&mut self) -> Option<Action> {
        if self.hovered.is_none() {
            return None;
        }
        self.hovered = None;
        self.tooltip_anchor = None;
        Some(Action::HoverChanged {
            markup_id: None,
            anchor: None,
        })
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, at: Point) -> Vec<Action> {
        match self.tool {
            Tool::Comment => {
                self.composer_at = Some(at);
                vec![Action::OpenComposer { at }]
            }
            Tool::Draw => {
                self.gesture = Gesture::Drawing(Path::start(at, &self.color, self.stroke_width));
                vec![Action::RenderNeeded]
            }
            _ => Vec::new(),
        }
    }

    pub fn on_pointer_move(&mut self, at: Point, markups: &[Markup], show_markups: bool) -> Vec<Action> {
        if let Gesture::Drawing(path) = &mut self.gesture {
            path.points.push(at);
            return vec![Action::RenderNeeded];
        }

        if self.tool != Tool::Select || !show_markups {
            return Vec::new();
        }

        match hit_test_pin(markups, at) {
            Some(pin) => {
                self.hovered = Some(pin.id);
                self.tooltip_anchor = Some(at);
                vec![Action::HoverChanged {
                    markup_id: Some(pin.id),
                    anchor: Some(at),
                }]
            }
            None => self.clear_hover().into_iter().collect(),
        }
    }

    /// End of drag. Two or more points commit; anything shorter was a click.
    pub fn on_pointer_up(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Drawing(path) if path.is_committable() => {
                vec![Action::CommitPath(path), Action::RenderNeeded]
            }
            Gesture::Drawing(_) => vec![Action::RenderNeeded],
            Gesture::Idle => Vec::new(),
        }
    }

    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        let mut actions = self.on_pointer_up();
        actions.extend(self.clear_hover());
        actions
    }
}
