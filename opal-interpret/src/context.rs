//! The interpreter context: the state stack and the path being built.

use crate::font::Font;
use crate::state::State;
use crate::InterpreterSettings;
use kurbo::{Affine, BezPath, Point};
use opal_raster::FillRule;
use opal_syntax::object::{Dict, Name};
use opal_syntax::page::Resources;
use rustc_hash::FxHashMap;

/// The mutable state of one interpretation run.
pub struct Context {
    states: Vec<State>,
    path: BezPath,
    last_point: Point,
    sub_path_start: Point,
    pending_clip: Option<FillRule>,
    form_depth: usize,
    settings: InterpreterSettings,
    /// Fonts already loaded during this run, keyed by the address of
    /// their font dictionary in the file buffer.
    fonts: FxHashMap<(usize, usize), Option<Font>>,
}

impl Context {
    /// Create a context whose initial transformation matrix is
    /// `base_transform` (the page-to-device map).
    pub fn new(base_transform: Affine, settings: InterpreterSettings) -> Self {
        let state = State {
            ctm: base_transform,
            ..State::default()
        };

        Self {
            states: vec![state],
            path: BezPath::new(),
            last_point: Point::ZERO,
            sub_path_start: Point::ZERO,
            pending_clip: None,
            form_depth: 0,
            settings,
            fonts: FxHashMap::default(),
        }
    }

    pub(crate) fn settings(&self) -> &InterpreterSettings {
        &self.settings
    }

    pub(crate) fn state(&self) -> &State {
        // The stack is never empty: `Q` refuses to pop the base state.
        self.states.last().unwrap()
    }

    pub(crate) fn state_mut(&mut self) -> &mut State {
        self.states.last_mut().unwrap()
    }

    pub(crate) fn save_state(&mut self) {
        self.states.push(self.state().clone());
    }

    /// Pop the state stack. Unbalanced `Q` operators clamp at the base
    /// state instead of underflowing.
    pub(crate) fn restore_state(&mut self) -> Option<State> {
        if self.states.len() > 1 {
            self.states.pop()
        } else {
            None
        }
    }

    pub(crate) fn stack_depth(&self) -> usize {
        self.states.len()
    }

    /// Pop down to a given stack depth (used to recover from content
    /// streams with unbalanced `q`).
    pub(crate) fn truncate_states(&mut self, depth: usize) {
        while self.states.len() > depth.max(1) {
            self.states.pop();
        }
    }

    pub(crate) fn path(&self) -> &BezPath {
        &self.path
    }

    pub(crate) fn path_mut(&mut self) -> &mut BezPath {
        &mut self.path
    }

    pub(crate) fn clear_path(&mut self) {
        self.path = BezPath::new();
    }

    pub(crate) fn last_point(&self) -> Point {
        self.last_point
    }

    pub(crate) fn set_last_point(&mut self, p: Point) {
        self.last_point = p;
    }

    pub(crate) fn sub_path_start(&self) -> Point {
        self.sub_path_start
    }

    pub(crate) fn set_sub_path_start(&mut self, p: Point) {
        self.sub_path_start = p;
    }

    pub(crate) fn pending_clip(&self) -> Option<FillRule> {
        self.pending_clip
    }

    pub(crate) fn set_pending_clip(&mut self, rule: Option<FillRule>) {
        self.pending_clip = rule;
    }

    pub(crate) fn take_pending_clip(&mut self) -> Option<FillRule> {
        self.pending_clip.take()
    }

    pub(crate) fn enter_form(&mut self) -> bool {
        if self.form_depth >= crate::interpret::FORM_NESTING_LIMIT {
            return false;
        }

        self.form_depth += 1;
        true
    }

    pub(crate) fn leave_form(&mut self) {
        self.form_depth = self.form_depth.saturating_sub(1);
    }

    /// Load (or fetch from cache) the font named `name` in the resource
    /// scope.
    pub(crate) fn font(&mut self, resources: &Resources<'_>, name: &Name) -> Option<Font> {
        let dict = resources
            .lookup(b"Font", name)
            .and_then(|obj| obj.into_dict())?;

        let key = {
            let data = dict.data();
            (data.as_ptr() as usize, data.len())
        };

        self.fonts
            .entry(key)
            .or_insert_with(|| Font::load(&dict))
            .clone()
    }

    /// Load a font from an explicit dictionary (used by `/ExtGState`
    /// font entries).
    pub(crate) fn font_from_dict(&mut self, dict: &Dict<'_>) -> Option<Font> {
        let key = {
            let data = dict.data();
            (data.as_ptr() as usize, data.len())
        };

        self.fonts
            .entry(key)
            .or_insert_with(|| Font::load(dict))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::InterpreterSettings;
    use kurbo::Affine;

    #[test]
    fn restore_clamps_at_base() {
        let mut ctx = Context::new(Affine::IDENTITY, InterpreterSettings::default());

        ctx.save_state();
        ctx.state_mut().line_width = 5.0;

        assert!(ctx.restore_state().is_some());
        assert_eq!(ctx.state().line_width, 1.0);

        // Excess restores are ignored.
        assert!(ctx.restore_state().is_none());
        assert!(ctx.restore_state().is_none());
        assert_eq!(ctx.stack_depth(), 1);
    }

    #[test]
    fn balanced_save_restore_roundtrips() {
        let mut ctx = Context::new(Affine::scale(2.0), InterpreterSettings::default());

        for _ in 0..8 {
            ctx.save_state();
            ctx.state_mut().ctm *= Affine::rotate(0.3);
            ctx.state_mut().fill_alpha = 0.5;
        }

        for _ in 0..8 {
            ctx.restore_state();
        }

        assert_eq!(ctx.state().ctm, Affine::scale(2.0));
        assert_eq!(ctx.state().fill_alpha, 1.0);
    }
}
