//! The annotated document: the ordered annotation list, id allocation, and
//! the history operations over them.
//!
//! The controller (`app.rs`) owns one `Document` and calls these methods
//! from its event handlers; annotations never reach back into the document
//! or into each other.

use crate::history::{History, Recorded, Undone};
use crate::model::{Annotation, LabelStyle};

#[derive(Debug, Default)]
pub struct Document {
    annotations: Vec<Annotation>,
    history: History,
    next_id: u32,
}

impl Document {
    pub fn new() -> Self {
        Self {
            annotations: Vec::new(),
            history: History::new(),
            next_id: 0,
        }
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    /// Create a new callout at `anchor` and record it for undo.
    pub fn create_annotation(
        &mut self,
        anchor: (f32, f32),
        text: String,
        style: &LabelStyle,
        image_size: (f32, f32),
    ) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.annotations
            .push(Annotation::new(id, anchor, text, style, image_size));
        self.history.record_create(id);
        log::debug!("created annotation {id} at {anchor:?}");
        id
    }

    /// Topmost annotation whose label bounds contain the image-space point.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<u32> {
        self.annotations
            .iter()
            .rev()
            .find(|a| a.hit_test(x, y))
            .map(|a| a.id)
    }

    /// Select one annotation and deselect every other.
    pub fn select_only(&mut self, id: u32) {
        for ann in &mut self.annotations {
            if ann.id == id {
                ann.select();
            } else {
                ann.deselect();
            }
        }
    }

    pub fn deselect_all(&mut self) {
        for ann in &mut self.annotations {
            ann.deselect();
        }
    }

    #[cfg(test)]
    pub fn selected_id(&self) -> Option<u32> {
        self.annotations.iter().find(|a| a.selected).map(|a| a.id)
    }

    /// Undo the most recent recorded action. Creation-undo removes the
    /// annotation and parks it (current position and style intact) on the
    /// redo stack.
    pub fn undo(&mut self) -> bool {
        match self.history.pop_undo() {
            Some(Recorded::Create { id }) => {
                if let Some(idx) = self.annotations.iter().position(|a| a.id == id) {
                    let annotation = self.annotations.remove(idx);
                    self.history.push_undone(Undone::Create { annotation });
                }
                true
            }
            None => false,
        }
    }

    /// Re-apply the most recently undone action.
    pub fn redo(&mut self) -> bool {
        match self.history.pop_redo() {
            Some(Undone::Create { annotation }) => {
                let id = annotation.id;
                self.annotations.push(annotation);
                self.history.push_recorded(Recorded::Create { id });
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Reset for a freshly loaded image: annotations and both history
    /// stacks go away together.
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Color4;

    fn style() -> LabelStyle {
        LabelStyle::default()
    }

    const IMG: (f32, f32) = (800.0, 600.0);

    #[test]
    fn create_undo_redo_round_trip() {
        let mut doc = Document::new();
        doc.create_annotation((100.0, 100.0), "first".into(), &style(), IMG);
        doc.create_annotation((300.0, 200.0), "second".into(), &style(), IMG);

        let before = doc.annotations().to_vec();
        assert!(doc.undo());
        assert_eq!(doc.annotations().len(), 1);
        assert!(doc.redo());
        assert_eq!(doc.annotations().to_vec(), before);
    }

    #[test]
    fn redo_restores_later_edits() {
        let mut doc = Document::new();
        let id = doc.create_annotation((100.0, 100.0), "note".into(), &style(), IMG);

        // Move and restyle after creation; none of this is recorded, so a
        // single undo removes the annotation and redo brings it back with
        // the edits intact.
        {
            let ann = doc.get_mut(id).unwrap();
            ann.move_by(40.0, -10.0);
            ann.size = 44.0;
            ann.color = Color4 {
                r: 0.0,
                g: 0.5,
                b: 1.0,
                a: 1.0,
            };
            ann.arrow_thickness = 3.0;
            ann.move_arrow_endpoint(12.0, 12.0);
        }
        let edited = doc.get(id).unwrap().clone();

        assert!(doc.undo());
        assert!(doc.get(id).is_none());
        assert!(doc.redo());
        assert_eq!(doc.get(id), Some(&edited));
    }

    #[test]
    fn undo_on_empty_document_is_noop() {
        let mut doc = Document::new();
        assert!(!doc.undo());
        assert!(!doc.redo());
    }

    #[test]
    fn new_create_clears_redo() {
        let mut doc = Document::new();
        doc.create_annotation((50.0, 50.0), "a".into(), &style(), IMG);
        doc.undo();
        assert!(doc.can_redo());
        doc.create_annotation((60.0, 60.0), "b".into(), &style(), IMG);
        assert!(!doc.can_redo());
    }

    #[test]
    fn clear_empties_everything() {
        let mut doc = Document::new();
        for i in 0..5 {
            doc.create_annotation((i as f32 * 50.0, 100.0), format!("n{i}"), &style(), IMG);
        }
        doc.undo();
        doc.clear();
        assert!(doc.is_empty());
        assert!(!doc.can_undo());
        assert!(!doc.can_redo());
    }

    #[test]
    fn select_only_deselects_siblings() {
        let mut doc = Document::new();
        let a = doc.create_annotation((100.0, 100.0), "a".into(), &style(), IMG);
        let b = doc.create_annotation((400.0, 100.0), "b".into(), &style(), IMG);
        doc.select_only(a);
        doc.select_only(b);
        assert_eq!(doc.selected_id(), Some(b));
        assert!(!doc.get(a).unwrap().selected);
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let mut doc = Document::new();
        let a = doc.create_annotation((100.0, 100.0), "under".into(), &style(), IMG);
        let b = doc.create_annotation((110.0, 105.0), "over".into(), &style(), IMG);
        assert_eq!(doc.hit_test(112.0, 105.0), Some(b));
        // A spot only the lower one covers.
        let only_a = doc.get(a).unwrap().label_bounds().min;
        assert_eq!(doc.hit_test(only_a.x + 1.0, 100.0), Some(a));
    }

    #[test]
    fn ids_stay_unique_across_undo() {
        let mut doc = Document::new();
        let a = doc.create_annotation((10.0, 10.0), "a".into(), &style(), IMG);
        doc.undo();
        let b = doc.create_annotation((20.0, 20.0), "b".into(), &style(), IMG);
        assert_ne!(a, b);
    }
}
