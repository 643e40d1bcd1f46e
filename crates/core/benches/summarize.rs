use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use readcast_core::{HtmlMediaScanner, ScorerConfig, SummaryEngine, TextScorer, extract_article_text};

fn bench_select(c: &mut Criterion) {
    let article = std::fs::read_to_string("../../tests/fixtures/tom_tat_noi_dung.txt").unwrap();
    let long = article.repeat(40);
    let scorer = TextScorer::default();

    let mut group = c.benchmark_group("select");

    group.bench_with_input(BenchmarkId::new("article", "12 sentences"), &article, |b, text| {
        b.iter(|| scorer.select(black_box(text)))
    });

    group.bench_with_input(BenchmarkId::new("long", "480 sentences"), &long, |b, text| {
        b.iter(|| scorer.select(black_box(text)))
    });

    group.finish();
}

fn bench_extractive(c: &mut Criterion) {
    let article = std::fs::read_to_string("../../tests/fixtures/english_article.txt").unwrap();
    let engine = SummaryEngine::local(ScorerConfig::english());

    c.bench_function("extractive_summary", |b| b.iter(|| engine.extractive(black_box(&article))));
}

fn bench_page(c: &mut Criterion) {
    let html = std::fs::read_to_string("../../tests/fixtures/podcast_article.html").unwrap();

    c.bench_function("extract_article_text", |b| b.iter(|| extract_article_text(black_box(&html))));

    let scanner = HtmlMediaScanner::new(html.clone());
    c.bench_function("media_scan", |b| b.iter(|| black_box(&scanner).scan()));
}

criterion_group!(benches, bench_select, bench_extractive, bench_page);
criterion_main!(benches);
