mod common;

use ai_meme_core::caption::{Anchor, DEFAULT_COLOR, DEFAULT_FONT_SIZE, Slot};
use ai_meme_core::error::{AppError, Precondition};
use ai_meme_core::image_processing::ImageSource;
use ai_meme_core::services::{CaptionService, ImageEditService};
use ai_meme_core::session::{InFlight, Outcome, Session};
use common::{FakeAi, FakeFetcher, RecordingCanvas, solid_image};

const CAT: &str = "cat.png";
const DOG: &str = "https://example.com/dog.jpg";

fn fetcher() -> FakeFetcher {
    FakeFetcher::default()
        .with(CAT, solid_image(40, 30, [10, 10, 10, 255]))
        .with(DOG, solid_image(20, 20, [200, 200, 200, 255]))
}

async fn loaded(source: &str) -> Session {
    let mut session = Session::with_seed(7);
    session
        .load_image(ImageSource::parse(source).unwrap(), &fetcher())
        .await
        .unwrap();
    session
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_load_resets_captions_and_suggestions() {
    let mut session = loaded(CAT).await;
    session.set_caption_text(Slot::Top, "old top");
    session.set_font_size(Slot::Bottom, 80.0).unwrap();
    session.request_caption_suggestions(&FakeAi::new()).await.unwrap();
    session.set_edit_text("add a hat");
    assert!(!session.suggestions().is_empty());

    session
        .load_image(ImageSource::parse(DOG).unwrap(), &fetcher())
        .await
        .unwrap();

    for slot in Slot::ALL {
        let caption = session.caption(slot);
        assert_eq!(caption.text, "");
        assert_eq!(caption.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(caption.color, DEFAULT_COLOR);
        assert_eq!(caption.anchor, slot.default_anchor());
    }
    assert!(session.suggestions().is_empty());
    assert_eq!(session.edit_text(), "");
    assert_eq!(session.current().map(|i| i.width()), Some(20));
    assert!(!session.image_state().is_edited());
    assert!(session.error().is_none());
}

#[tokio::test]
async fn test_load_failure_leaves_no_image() {
    let mut session = Session::new();

    let err = session
        .load_image(ImageSource::parse("missing.png").unwrap(), &fetcher())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ImageLoad { .. }));
    assert!(session.current().is_none());
    assert!(session.original().is_none());
    assert_eq!(session.error(), Some("Failed to process image file."));
    assert!(!session.in_flight().loading_image);
}

#[tokio::test]
async fn test_failed_template_load_has_template_message() {
    let mut session = Session::new();
    let source = ImageSource::parse("https://example.com/gone.png").unwrap();

    session.load_image(source, &fetcher()).await.unwrap_err();

    assert!(session.error().unwrap().starts_with("Failed to load template image"));
}

#[tokio::test]
async fn test_superseded_load_is_discarded() {
    let mut session = Session::new();
    let first = session.begin_load(ImageSource::parse(CAT).unwrap());
    let second = session.begin_load(ImageSource::parse(DOG).unwrap());

    let dog = solid_image(20, 20, [0, 0, 0, 255]);
    assert_eq!(session.finish_load(second, Ok(dog)).unwrap(), Outcome::Applied);

    let cat = solid_image(40, 30, [0, 0, 0, 255]);
    assert_eq!(session.finish_load(first, Ok(cat)).unwrap(), Outcome::Discarded);
    assert_eq!(session.current().map(|i| i.width()), Some(20));
}

// ---------------------------------------------------------------------------
// Caption suggestions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_captions_without_image_is_precondition() {
    let mut session = Session::new();
    let ai = FakeAi::new();

    let err = session.request_caption_suggestions(&ai).await.unwrap_err();

    assert!(matches!(err, AppError::Precondition(Precondition::NoImageForCaptions)));
    assert!(session.suggestions().is_empty());
    assert!(session.error().is_some());
    assert!(ai.caption_inputs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_caption_failure_clears_previous_suggestions() {
    let mut session = loaded(CAT).await;

    session.request_caption_suggestions(&FakeAi::new()).await.unwrap();
    assert_eq!(session.suggestions(), ["ONE DOES NOT SIMPLY", "MUCH WOW"]);
    assert!(!session.is_generating_captions());

    let err = session
        .request_caption_suggestions(&FakeAi::failing())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SuggestionGeneration(_)));
    assert!(session.suggestions().is_empty());
    assert_eq!(
        session.error(),
        Some("Couldn't generate captions. The AI might be busy. Please try again.")
    );
    assert!(!session.is_generating_captions());
}

#[tokio::test]
async fn test_success_clears_error() {
    let mut session = loaded(CAT).await;
    session.request_caption_suggestions(&FakeAi::failing()).await.unwrap_err();
    assert!(session.error().is_some());

    session.request_caption_suggestions(&FakeAi::new()).await.unwrap();
    assert!(session.error().is_none());
}

#[tokio::test]
async fn test_captions_are_asked_for_the_current_image() {
    let mut session = loaded(CAT).await;
    let ai = FakeAi::new();
    session.request_image_edit(&ai, "make it red").await.unwrap();

    session.request_caption_suggestions(&ai).await.unwrap();

    let current = session.current().unwrap().to_base64();
    assert_eq!(ai.caption_inputs.lock().unwrap().as_slice(), [current]);
}

#[tokio::test]
async fn test_use_suggestion_fills_caption() {
    let mut session = loaded(CAT).await;
    session.request_caption_suggestions(&FakeAi::new()).await.unwrap();

    assert!(session.use_suggestion(Slot::Bottom, 1));
    assert_eq!(session.caption(Slot::Bottom).text, "MUCH WOW");
    assert!(!session.use_suggestion(Slot::Top, 5));
    assert_eq!(session.caption(Slot::Top).text, "");
}

// ---------------------------------------------------------------------------
// Image edits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_edits_always_start_from_the_original() {
    let mut session = loaded(CAT).await;
    let original = session.original().unwrap().clone();
    let ai = FakeAi::new();

    session.request_image_edit(&ai, "add sunglasses").await.unwrap();
    session.request_image_edit(&ai, "now add a hat").await.unwrap();

    let inputs = ai.edit_inputs.lock().unwrap();
    assert_eq!(inputs.len(), 2);
    assert!(inputs.iter().all(|(base64, _)| *base64 == original.to_base64()));
    assert_eq!(inputs[1].1, "now add a hat");

    assert_eq!(session.original(), Some(&original));
    assert_eq!(session.current().map(|i| i.width()), Some(8));
    assert!(session.image_state().is_edited());
    assert_eq!(session.edit_text(), "now add a hat");
}

#[tokio::test]
async fn test_blank_instruction_is_precondition() {
    let mut session = loaded(CAT).await;
    let ai = FakeAi::new();

    let err = session.request_image_edit(&ai, "   ").await.unwrap_err();

    assert!(matches!(err, AppError::Precondition(Precondition::BlankInstruction)));
    assert!(ai.edit_inputs.lock().unwrap().is_empty());
    assert!(!session.is_editing_image());
}

#[tokio::test]
async fn test_edit_without_image_is_precondition() {
    let mut session = Session::new();
    let err = session
        .request_image_edit(&FakeAi::new(), "add a hat")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Precondition(Precondition::NoImageForEdit)));
}

#[tokio::test]
async fn test_failed_edit_keeps_current_image() {
    let mut session = loaded(CAT).await;
    session.request_image_edit(&FakeAi::new(), "make it red").await.unwrap();
    let edited = session.current().unwrap().clone();

    let err = session
        .request_image_edit(&FakeAi::failing(), "make it blue")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ImageEdit(_)));
    assert_eq!(session.current(), Some(&edited));
    assert_eq!(
        session.error(),
        Some("Couldn't edit the image. Please try again with a different prompt.")
    );
    assert!(!session.is_editing_image());
}

#[tokio::test]
async fn test_edit_for_replaced_image_is_discarded() {
    let mut session = loaded(CAT).await;
    let ai = FakeAi::new();
    let ticket = session.begin_image_edit("add a hat").unwrap();
    let result = ai
        .edit_image(
            ticket.original().to_base64(),
            ticket.original().mime_type().to_string(),
            ticket.instruction().to_string(),
        )
        .await;

    session
        .load_image(ImageSource::parse(DOG).unwrap(), &fetcher())
        .await
        .unwrap();
    let dog = session.current().unwrap().clone();

    assert_eq!(session.finish_image_edit(ticket, result).unwrap(), Outcome::Discarded);
    assert_eq!(session.current(), Some(&dog));
    assert!(!session.image_state().is_edited());
}

#[tokio::test]
async fn test_stale_captions_leave_newer_request_pending() {
    let mut session = loaded(CAT).await;
    let ai = FakeAi::new();
    let stale = session.begin_caption_suggestions().unwrap();

    session
        .load_image(ImageSource::parse(DOG).unwrap(), &fetcher())
        .await
        .unwrap();
    assert!(!session.is_generating_captions());
    let fresh = session.begin_caption_suggestions().unwrap();

    let stale_result = ai
        .generate_captions(stale.image().to_base64(), stale.image().mime_type().to_string())
        .await;
    assert_eq!(
        session.finish_caption_suggestions(stale, stale_result).unwrap(),
        Outcome::Discarded
    );
    assert!(session.suggestions().is_empty());
    assert!(session.is_generating_captions());

    let fresh_result = ai
        .generate_captions(fresh.image().to_base64(), fresh.image().mime_type().to_string())
        .await;
    assert_eq!(
        session.finish_caption_suggestions(fresh, fresh_result).unwrap(),
        Outcome::Applied
    );
    assert_eq!(session.suggestions().len(), 2);
    assert!(!session.is_generating_captions());
}

#[tokio::test]
async fn test_stale_edit_leaves_newer_edit_pending() {
    let mut session = loaded(CAT).await;
    let ai = FakeAi::new();
    let stale = session.begin_image_edit("add a hat").unwrap();

    session
        .load_image(ImageSource::parse(DOG).unwrap(), &fetcher())
        .await
        .unwrap();
    let fresh = session.begin_image_edit("add a scarf").unwrap();

    let stale_result = ai
        .edit_image(
            stale.original().to_base64(),
            stale.original().mime_type().to_string(),
            stale.instruction().to_string(),
        )
        .await;
    assert_eq!(session.finish_image_edit(stale, stale_result).unwrap(), Outcome::Discarded);
    assert!(session.is_editing_image());
    assert!(!session.image_state().is_edited());

    let fresh_result = ai
        .edit_image(
            fresh.original().to_base64(),
            fresh.original().mime_type().to_string(),
            fresh.instruction().to_string(),
        )
        .await;
    assert_eq!(session.finish_image_edit(fresh, fresh_result).unwrap(), Outcome::Applied);
    assert!(!session.is_editing_image());
    assert!(session.image_state().is_edited());
}

#[tokio::test]
async fn test_reload_clears_pending_flags() {
    let mut session = loaded(CAT).await;
    let captions = session.begin_caption_suggestions().unwrap();
    let edit = session.begin_image_edit("add a hat").unwrap();

    session
        .load_image(ImageSource::parse(DOG).unwrap(), &fetcher())
        .await
        .unwrap();
    assert_eq!(session.in_flight(), InFlight::default());

    let late = session.finish_caption_suggestions(captions, Ok(vec!["LATE".to_string()]));
    assert_eq!(late.unwrap(), Outcome::Discarded);
    let late = session.finish_image_edit(edit, Err(AppError::gemini("timed out")));
    assert_eq!(late.unwrap(), Outcome::Discarded);
    assert_eq!(session.in_flight(), InFlight::default());
    assert!(session.suggestions().is_empty());
    assert!(session.error().is_none());
}

#[tokio::test]
async fn test_edit_and_captions_can_overlap() {
    let mut session = loaded(CAT).await;
    let ai = FakeAi::new();

    let edit = session.begin_image_edit("add a hat").unwrap();
    let captions = session.begin_caption_suggestions().unwrap();
    assert!(session.is_editing_image());
    assert!(session.is_generating_captions());

    let (edit_result, caption_result) = tokio::join!(
        ai.edit_image(
            edit.original().to_base64(),
            edit.original().mime_type().to_string(),
            edit.instruction().to_string(),
        ),
        ai.generate_captions(captions.image().to_base64(), captions.image().mime_type().to_string()),
    );

    assert_eq!(
        session.finish_caption_suggestions(captions, caption_result).unwrap(),
        Outcome::Applied
    );
    assert_eq!(session.finish_image_edit(edit, edit_result).unwrap(), Outcome::Applied);
    assert_eq!(session.suggestions().len(), 2);
    assert!(session.image_state().is_edited());
    assert_eq!(session.in_flight(), InFlight::default());
}

// ---------------------------------------------------------------------------
// Caption fields and export
// ---------------------------------------------------------------------------

#[test]
fn test_font_size_must_be_positive() {
    let mut session = Session::new();
    for bad in [0.0, -4.0, f32::NAN, f32::INFINITY] {
        let err = session.set_font_size(Slot::Top, bad).unwrap_err();
        assert!(matches!(err, AppError::Precondition(Precondition::InvalidFontSize)));
    }
    assert_eq!(session.caption(Slot::Top).font_size, DEFAULT_FONT_SIZE);

    session.set_font_size(Slot::Top, 72.5).unwrap();
    assert_eq!(session.caption(Slot::Top).font_size, 72.5);
}

#[test]
fn test_setters_touch_one_slot_and_field() {
    let mut session = Session::new();
    session.set_caption_text(Slot::Top, "top text");
    session.set_font_family(Slot::Top, "Anton, sans-serif");
    session.set_color(Slot::Top, "#00FF00");
    session.set_anchor(Slot::Top, Anchor::new(0.3, 0.4));
    session.set_active(Slot::Top, true);

    let top = session.caption(Slot::Top);
    assert_eq!(top.text, "top text");
    assert_eq!(top.font_family, "Anton, sans-serif");
    assert_eq!(top.color, "#00FF00");
    assert_eq!(top.anchor, Anchor::new(0.3, 0.4));
    assert!(top.active);
    assert_eq!(top.font_size, DEFAULT_FONT_SIZE);

    let bottom = session.caption(Slot::Bottom);
    assert_eq!(bottom.text, "");
    assert_eq!(bottom.color, DEFAULT_COLOR);
    assert_eq!(bottom.anchor, Slot::Bottom.default_anchor());
    assert!(!bottom.active);
}

#[tokio::test]
async fn test_export_requires_a_caption() {
    let mut session = loaded(CAT).await;
    let mut canvas = RecordingCanvas::new(40, 30);

    let err = session.export_to(&mut canvas).unwrap_err();

    assert!(matches!(err, AppError::Precondition(Precondition::NoCaptions)));
    assert_eq!(
        session.error(),
        Some("Please add at least one caption before downloading.")
    );
    assert!(canvas.ops.is_empty());
}

#[test]
fn test_export_requires_an_image() {
    let mut session = Session::new();
    session.set_caption_text(Slot::Top, "hello");
    let err = session.export_to(&mut RecordingCanvas::new(1, 1)).unwrap_err();
    assert!(matches!(err, AppError::Precondition(Precondition::NoImageForExport)));
}

#[tokio::test]
async fn test_export_draws_the_edited_image() {
    let mut session = loaded(CAT).await;
    session.request_image_edit(&FakeAi::new(), "shrink it").await.unwrap();
    session.set_caption_text(Slot::Bottom, "tiny");

    let mut canvas = RecordingCanvas::new(8, 8);
    session.export_to(&mut canvas).unwrap();

    assert_eq!(canvas.ops[0], common::Op::Image { width: 8, height: 8 });
    assert_eq!(canvas.fills().len(), 1);
    assert!(session.error().is_none());
}

#[tokio::test]
async fn test_export_failure_is_reported() {
    let mut session = loaded(CAT).await;
    session.set_caption_text(Slot::Top, "hello");
    let mut canvas = RecordingCanvas::new(40, 30);
    canvas.fail_image = true;

    let err = session.export_to(&mut canvas).unwrap_err();

    assert!(matches!(err, AppError::Composition(_)));
    assert_eq!(
        session.error(),
        Some("Failed to load image for download. An unexpected error occurred.")
    );
}
