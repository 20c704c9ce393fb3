//! Benchmarks for SFC parsing and style compilation.
//!
//! Run with: cargo bench -p vellum_atelier_sfc

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use vellum_atelier_sfc::{
    clear_parse_cache, compile_style, parse_sfc, SfcParseOptions, StyleCompileOptions,
};

const COMPONENT: &str = r#"<template>
  <div class="card" :class="{ active }">
    <img src="./logo.png" alt="logo">
    <h2>{{ title }}</h2>
    <slot />
  </div>
</template>

<script setup lang="ts">
defineProps<{ title: string; active: boolean }>()
</script>

<style scoped>
.card {
  padding: 20px;
  display: flex;
}
.card.active ::v-deep(.title) { color: red; }
@media (max-width: 600px) {
  .card { padding: 8px; }
}
</style>
"#;

fn generate_styles(rules: usize) -> String {
    let mut css = String::with_capacity(rules * 48);
    for i in 0..rules {
        css.push_str(&format!(".item-{i} > .child:hover {{ margin: {i}px; color: red; }}\n"));
    }
    css
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("sfc_parse");
    group.throughput(Throughput::Bytes(COMPONENT.len() as u64));

    group.bench_function("uncached", |b| {
        b.iter(|| {
            clear_parse_cache();
            parse_sfc(black_box(COMPONENT), SfcParseOptions::default())
        })
    });

    group.bench_function("cached", |b| {
        b.iter(|| parse_sfc(black_box(COMPONENT), SfcParseOptions::default()))
    });

    group.finish();
}

fn bench_scoped_style(c: &mut Criterion) {
    let css = generate_styles(200);
    let mut group = c.benchmark_group("style_compile");
    group.throughput(Throughput::Bytes(css.len() as u64));

    group.bench_function("scoped_200_rules", |b| {
        b.iter(|| {
            compile_style(StyleCompileOptions {
                source: black_box(css.clone()),
                filename: "Bench.vue".to_string(),
                id: "data-v-bench".to_string(),
                scoped: true,
                ..Default::default()
            })
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_scoped_style);
criterion_main!(benches);
