//! Storyboard editor state.
//!
//! A [`StoryboardEditor`] holds a working copy of one plan next to the
//! snapshot it was last saved as. Every mutation touches only the working
//! copy; [`StoryboardEditor::save`] is the single point where the document
//! reaches a [`PlanWriter`]. Unsaved-change detection is plain structural
//! equality between the two copies, so row heights and row order count.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::storyboard::{
    validate_title, AttachedFile, PlanDocument, PlanMetadata, RowKind, RowOrder, StoryboardItem,
    FILE_SLOTS, MAX_ITEMS_PER_PLAN,
};
use crate::types::{DbId, Timestamp};
use crate::upload::{validate_image, validate_upload};
use crate::writer::PlanWriter;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Partial update of an item's text rows. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemTextPatch {
    pub timeline: Option<String>,
    pub effect: Option<String>,
    pub narration: Option<String>,
    pub note: Option<String>,
}

/// A file to attach, as sent by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct FileUpload {
    pub name: String,
    /// Base64 payload or `data:` URL.
    pub data: String,
}

/// Snapshot of editor state returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct EditorView<'a> {
    pub plan_id: DbId,
    pub document: &'a PlanDocument,
    pub has_unsaved_changes: bool,
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoryboardEditor {
    plan_id: DbId,
    working: PlanDocument,
    saved: PlanDocument,
}

impl StoryboardEditor {
    /// Start editing `document`, which is taken as the last-saved snapshot.
    pub fn open(plan_id: DbId, mut document: PlanDocument) -> Self {
        document.renumber();
        Self {
            plan_id,
            working: document.clone(),
            saved: document,
        }
    }

    pub fn plan_id(&self) -> DbId {
        self.plan_id
    }

    pub fn document(&self) -> &PlanDocument {
        &self.working
    }

    pub fn saved_document(&self) -> &PlanDocument {
        &self.saved
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.working != self.saved
    }

    pub fn view(&self) -> EditorView<'_> {
        EditorView {
            plan_id: self.plan_id,
            document: &self.working,
            has_unsaved_changes: self.has_unsaved_changes(),
        }
    }

    fn item_mut(&mut self, id: &str) -> Result<&mut StoryboardItem, CoreError> {
        self.working
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()))
    }

    fn index_of(&self, id: &str) -> Result<usize, CoreError> {
        self.working
            .item_index(id)
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()))
    }

    // -- Plan-level fields --------------------------------------------------

    pub fn set_title(&mut self, title: &str) -> Result<(), CoreError> {
        validate_title(title)?;
        self.working.title = title.trim().to_string();
        Ok(())
    }

    pub fn set_metadata(&mut self, metadata: PlanMetadata) {
        self.working.metadata = metadata;
    }

    pub fn set_brand(&mut self, brand_id: Option<DbId>) {
        self.working.brand_id = brand_id;
    }

    /// The brand `brand_id` no longer exists: move both copies that point at
    /// it to the unassigned group. The store has already done the same to the
    /// saved plan, so this is not an unsaved change. Returns whether anything
    /// pointed at it.
    pub fn forget_brand(&mut self, brand_id: DbId) -> bool {
        let mut touched = false;
        for doc in [&mut self.working, &mut self.saved] {
            if doc.brand_id == Some(brand_id) {
                doc.brand_id = None;
                touched = true;
            }
        }
        touched
    }

    // -- Items --------------------------------------------------------------

    /// Insert a blank item at `at` (or at the end) and return it.
    pub fn add_item(&mut self, at: Option<usize>) -> Result<&StoryboardItem, CoreError> {
        let len = self.working.items.len();
        if len >= MAX_ITEMS_PER_PLAN {
            return Err(CoreError::Validation(format!(
                "a plan holds at most {MAX_ITEMS_PER_PLAN} items"
            )));
        }
        let index = at.unwrap_or(len);
        if index > len {
            return Err(CoreError::Validation(format!(
                "insert index {index} is past the end ({len} items)"
            )));
        }
        self.working.items.insert(index, StoryboardItem::new(index as u32));
        self.working.renumber();
        Ok(&self.working.items[index])
    }

    pub fn remove_item(&mut self, id: &str) -> Result<StoryboardItem, CoreError> {
        let index = self.index_of(id)?;
        let removed = self.working.items.remove(index);
        self.working.renumber();
        Ok(removed)
    }

    pub fn update_item(&mut self, id: &str, patch: ItemTextPatch) -> Result<(), CoreError> {
        let item = self.item_mut(id)?;
        if let Some(v) = patch.timeline {
            item.timeline = v;
        }
        if let Some(v) = patch.effect {
            item.effect = v;
        }
        if let Some(v) = patch.narration {
            item.narration = v;
        }
        if let Some(v) = patch.note {
            item.note = v;
        }
        Ok(())
    }

    /// Move an item (a storyboard column) to index `to`.
    pub fn move_item(&mut self, id: &str, to: usize) -> Result<(), CoreError> {
        let from = self.index_of(id)?;
        let len = self.working.items.len();
        if to >= len {
            return Err(CoreError::Validation(format!(
                "target index {to} is out of range ({len} items)"
            )));
        }
        let item = self.working.items.remove(from);
        self.working.items.insert(to, item);
        self.working.renumber();
        Ok(())
    }

    pub fn set_image(&mut self, id: &str, data: String) -> Result<(), CoreError> {
        validate_image(id, &data)?;
        self.item_mut(id)?.image = Some(data);
        Ok(())
    }

    pub fn clear_image(&mut self, id: &str) -> Result<(), CoreError> {
        self.item_mut(id)?.image = None;
        Ok(())
    }

    /// Attach a file to `slot`, or to the first free slot when `slot` is
    /// `None`. Returns the slot used. Oversized files are rejected before the
    /// item is touched.
    pub fn attach_file(
        &mut self,
        id: &str,
        slot: Option<usize>,
        upload: FileUpload,
        now: Timestamp,
    ) -> Result<usize, CoreError> {
        if let Some(slot) = slot {
            check_slot(slot)?;
        }
        let size = validate_upload(&upload.name, &upload.data)?;

        let item = self.item_mut(id)?;
        let slot = match slot {
            Some(slot) => slot,
            None => item.files.iter().position(Option::is_none).ok_or_else(|| {
                CoreError::Validation(format!("all {FILE_SLOTS} file slots are in use"))
            })?,
        };
        item.files[slot] = Some(AttachedFile {
            name: upload.name,
            data: upload.data,
            size,
            uploaded_at: now,
        });
        Ok(slot)
    }

    pub fn detach_file(&mut self, id: &str, slot: usize) -> Result<AttachedFile, CoreError> {
        check_slot(slot)?;
        self.item_mut(id)?.files[slot]
            .take()
            .ok_or_else(|| CoreError::Validation(format!("file slot {slot} is empty")))
    }

    // -- Rows ---------------------------------------------------------------

    pub fn move_row(&mut self, from: usize, to: usize) -> Result<(), CoreError> {
        self.working.row_order.move_row(from, to)
    }

    pub fn set_row_order(&mut self, order: Vec<RowKind>) -> Result<(), CoreError> {
        self.working.row_order = RowOrder::try_from_vec(order)?;
        Ok(())
    }

    pub fn resize_row(&mut self, kind: RowKind, height: u32) -> Result<(), CoreError> {
        self.working.row_heights.set(kind, height)
    }

    // -- Commit / revert ----------------------------------------------------

    /// Commit the full working copy with a single write. The snapshot only
    /// moves forward when the write succeeds.
    pub async fn save<W: PlanWriter + ?Sized>(&mut self, writer: &W) -> Result<(), W::Error> {
        writer.write_document(self.plan_id, &self.working).await?;
        self.saved = self.working.clone();
        Ok(())
    }

    /// Throw away unsaved changes.
    pub fn discard(&mut self) {
        self.working = self.saved.clone();
    }
}

fn check_slot(slot: usize) -> Result<(), CoreError> {
    if slot >= FILE_SLOTS {
        return Err(CoreError::Validation(format!(
            "file slot must be below {FILE_SLOTS}, got {slot}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;
    use crate::upload::{encode, MAX_UPLOAD_BYTES};
    use crate::writer::recording::{Call, RecordingWriter};

    fn editor_with_items(n: usize) -> StoryboardEditor {
        let mut doc = PlanDocument::new("Teaser", Some(1));
        for i in 0..n {
            doc.items.push(StoryboardItem::new(i as u32));
        }
        StoryboardEditor::open(7, doc)
    }

    fn first_id(editor: &StoryboardEditor) -> String {
        editor.document().items[0].id.clone()
    }

    fn small_file(name: &str) -> FileUpload {
        FileUpload {
            name: name.to_string(),
            data: encode(b"tiny"),
        }
    }

    #[test]
    fn fresh_editor_is_clean() {
        assert!(!editor_with_items(2).has_unsaved_changes());
    }

    #[test]
    fn text_edit_marks_dirty_and_reverting_marks_clean() {
        let mut editor = editor_with_items(1);
        let id = first_id(&editor);
        editor
            .update_item(&id, ItemTextPatch { note: Some("close-up".into()), ..Default::default() })
            .unwrap();
        assert!(editor.has_unsaved_changes());

        editor
            .update_item(&id, ItemTextPatch { note: Some(String::new()), ..Default::default() })
            .unwrap();
        assert!(!editor.has_unsaved_changes());
    }

    #[test]
    fn row_height_and_order_count_as_changes() {
        let mut editor = editor_with_items(1);
        editor.resize_row(RowKind::Narration, 240).unwrap();
        assert!(editor.has_unsaved_changes());
        editor.resize_row(RowKind::Narration, crate::storyboard::DEFAULT_ROW_HEIGHT).unwrap();
        assert!(!editor.has_unsaved_changes());

        editor.move_row(0, 3).unwrap();
        assert!(editor.has_unsaved_changes());
        editor.move_row(3, 0).unwrap();
        assert!(!editor.has_unsaved_changes());
    }

    #[test]
    fn add_and_move_items_keep_positions_in_sync() {
        let mut editor = editor_with_items(2);
        let new_id = editor.add_item(Some(0)).unwrap().id.clone();
        assert_eq!(editor.document().items[0].id, new_id);

        editor.move_item(&new_id, 2).unwrap();
        let positions: Vec<u32> = editor.document().items.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(editor.document().items[2].id, new_id);
    }

    #[test]
    fn add_past_end_is_rejected() {
        let mut editor = editor_with_items(1);
        assert_matches!(editor.add_item(Some(5)), Err(CoreError::Validation(_)));
    }

    #[test]
    fn remove_unknown_item_is_not_found() {
        let mut editor = editor_with_items(1);
        assert_matches!(editor.remove_item("nope"), Err(CoreError::ItemNotFound(_)));
    }

    #[test]
    fn set_row_order_rejects_non_permutations() {
        let mut editor = editor_with_items(0);
        assert!(editor.set_row_order(vec![RowKind::Note]).is_err());
        assert_eq!(editor.document().row_order, RowOrder::default());
    }

    #[test]
    fn attach_fills_first_free_slot_then_runs_out() {
        let mut editor = editor_with_items(1);
        let id = first_id(&editor);
        let now = Utc::now();
        assert_eq!(editor.attach_file(&id, None, small_file("a"), now).unwrap(), 0);
        assert_eq!(editor.attach_file(&id, None, small_file("b"), now).unwrap(), 1);
        assert_eq!(editor.attach_file(&id, None, small_file("c"), now).unwrap(), 2);
        assert_matches!(
            editor.attach_file(&id, None, small_file("d"), now),
            Err(CoreError::Validation(_))
        );

        let removed = editor.detach_file(&id, 1).unwrap();
        assert_eq!(removed.name, "b");
        assert_eq!(editor.attach_file(&id, None, small_file("e"), now).unwrap(), 1);
    }

    #[test]
    fn oversized_file_is_rejected_before_attaching() {
        let mut editor = editor_with_items(1);
        let id = first_id(&editor);
        let upload = FileUpload {
            name: "raw.mov".into(),
            data: encode(&vec![1u8; MAX_UPLOAD_BYTES as usize + 1]),
        };
        assert_matches!(
            editor.attach_file(&id, None, upload, Utc::now()),
            Err(CoreError::FileTooLarge { .. })
        );
        assert!(editor.document().items[0].attached_files().next().is_none());
        assert!(!editor.has_unsaved_changes());
    }

    #[test]
    fn invalid_slot_is_rejected() {
        let mut editor = editor_with_items(1);
        let id = first_id(&editor);
        assert!(editor.attach_file(&id, Some(3), small_file("a"), Utc::now()).is_err());
        assert!(editor.detach_file(&id, 0).is_err(), "empty slot");
    }

    #[test]
    fn set_and_clear_image() {
        let mut editor = editor_with_items(1);
        let id = first_id(&editor);
        let data = format!("data:image/png;base64,{}", encode(b"png"));
        editor.set_image(&id, data).unwrap();
        assert!(editor.document().items[0].image.is_some());
        editor.clear_image(&id).unwrap();
        assert!(!editor.has_unsaved_changes());
    }

    #[tokio::test]
    async fn save_writes_once_and_cleans() {
        let mut editor = editor_with_items(1);
        editor.set_title("Final cut").unwrap();
        let writer = RecordingWriter::default();

        editor.save(&writer).await.unwrap();

        let calls = writer.calls();
        assert_eq!(calls.len(), 1);
        assert_matches!(&calls[0], Call::Document(7, doc) if doc.title == "Final cut");
        assert!(!editor.has_unsaved_changes());
    }

    #[tokio::test]
    async fn failed_save_keeps_changes_pending() {
        let mut editor = editor_with_items(1);
        editor.set_title("Draft 2").unwrap();
        let writer = RecordingWriter::failing_at(0);

        assert!(editor.save(&writer).await.is_err());
        assert!(editor.has_unsaved_changes());
        assert_eq!(editor.saved_document().title, "Teaser");
    }

    #[test]
    fn forgetting_a_brand_unassigns_both_copies() {
        let mut editor = editor_with_items(1);
        editor.set_title("Teaser v2").unwrap();

        assert!(editor.forget_brand(1));
        assert_eq!(editor.document().brand_id, None);
        assert_eq!(editor.saved_document().brand_id, None);
        assert!(!editor.forget_brand(1));

        editor.set_title("Teaser").unwrap();
        assert!(!editor.has_unsaved_changes());
    }

    #[test]
    fn forgetting_another_brand_changes_nothing() {
        let mut editor = editor_with_items(1);
        editor.set_brand(Some(3));

        assert!(!editor.forget_brand(9));
        assert_eq!(editor.document().brand_id, Some(3));
        assert_eq!(editor.saved_document().brand_id, Some(1));
    }

    #[test]
    fn discard_restores_snapshot() {
        let mut editor = editor_with_items(2);
        let id = first_id(&editor);
        editor.remove_item(&id).unwrap();
        editor.discard();
        assert_eq!(editor.document().items.len(), 2);
        assert!(!editor.has_unsaved_changes());
    }
}
