use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use richtext_core::{Document, EditingSession, Selection, SelectionPoint, style, text};

fn large_document(block_count: usize) -> Document {
    let mut out = String::with_capacity(block_count * 64);
    for i in 0..block_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog (richtext-core benchmark)\n"
        ));
    }
    // Drop the final '\n' to avoid a trailing empty block.
    out.pop();
    Document::from_text(&out)
}

fn bench_style_toggle_whole_document(c: &mut Criterion) {
    let session = EditingSession::new(large_document(5_000));
    let session = session.force_selection(Selection::all(session.document()));
    c.bench_function("style_toggle/5k_blocks", |b| {
        b.iter(|| {
            let out = style::toggle_font_size(black_box(&session), 24);
            black_box(out.undo_depth());
        })
    });
}

fn bench_style_toggle_small_range(c: &mut Criterion) {
    let session = EditingSession::new(large_document(50_000));
    let session = session.force_selection(Selection::new(
        SelectionPoint::new("b25000".into(), 4),
        SelectionPoint::new("b25002".into(), 10),
    ));
    c.bench_function("style_toggle/3_of_50k_blocks", |b| {
        b.iter(|| {
            let out = style::toggle_color(black_box(&session), "#ff0000");
            black_box(out.undo_depth());
        })
    });
}

fn bench_typing(c: &mut Criterion) {
    let document = large_document(10_000);
    c.bench_function("typing/100_inserts_random_blocks", |b| {
        b.iter_batched(
            || (EditingSession::new(document.clone()), StdRng::seed_from_u64(7)),
            |(mut session, mut rng)| {
                for _ in 0..100 {
                    let index = rng.gen_range(0..10_000);
                    let key = format!("b{index}");
                    session = session.force_selection(Selection::caret(key.as_str(), 8));
                    session = text::insert_text(&session, "x", true);
                }
                black_box(session.undo_depth());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_undo_redo(c: &mut Criterion) {
    let mut session = EditingSession::new(large_document(1_000));
    for i in 0..200 {
        session = session.force_selection(Selection::within(format!("b{i}").as_str(), 0, 6));
        session = style::toggle_inline_style(&session, "BOLD");
    }
    c.bench_function("history/undo_redo_200", |b| {
        b.iter(|| {
            let mut s = session.clone();
            for _ in 0..200 {
                s = s.undo();
            }
            for _ in 0..200 {
                s = s.redo();
            }
            black_box(s.undo_depth());
        })
    });
}

criterion_group!(
    benches,
    bench_style_toggle_whole_document,
    bench_style_toggle_small_range,
    bench_typing,
    bench_undo_redo
);
criterion_main!(benches);
