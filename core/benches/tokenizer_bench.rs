use criterion::{criterion_group, criterion_main, Criterion};
use newsdex_core::tokenizer::tokenize;

const ARTICLE: &str = "国务院新闻办公室今天上午举行新闻发布会，介绍今年前三季度国民经济运行情况。\
    Officials said industrial output rose steadily while retail sales recovered in September. \
    发布会上，有关负责人表示，经济运行总体平稳、稳中有进。";

fn bench_tokenize(c: &mut Criterion) {
    let text = ARTICLE.repeat(50);
    c.bench_function("tokenize_article", |b| b.iter(|| tokenize(&text)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
