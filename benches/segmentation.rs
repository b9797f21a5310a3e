use anyhow::Result;
use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

use media_recap::llm::{ChatMessage, LLMProvider, LLMResponse, LLM};
use media_recap::topics::{
    coalesce_similar_ids, segments_from_ids, split_by_dominant_topics, Similarity, TurnBoundary,
};
use media_recap::{ChunkSummarizer, Transcript};

fn synthetic_boundaries(n: u32) -> Vec<TurnBoundary> {
    const PATTERN: [Similarity; 4] = [
        Similarity::NotSimilar,
        Similarity::ExtremelySimilar,
        Similarity::VerySimilar,
        Similarity::SomewhatSimilar,
    ];

    (0..n)
        .map(|id| TurnBoundary {
            id,
            topic: format!("topic {}", id / 4),
            similarity: PATTERN[(id % 4) as usize],
        })
        .collect()
}

/// Equal-length runs of `distinct` labels, the shape clustering produces
fn synthetic_labels(n: usize, distinct: i64) -> Vec<i64> {
    (0..n).map(|i| (i as i64 * distinct) / n as i64).collect()
}

fn synthetic_vtt(cues: usize) -> String {
    let mut vtt = String::from("WEBVTT\n\n");
    for i in 0..cues {
        let start = i as u64 * 7;
        let end = start + 6;
        vtt.push_str(&format!(
            "{:02}:{:02}:{:02}.000 --> {:02}:{:02}:{:02}.000\n",
            start / 3600,
            (start % 3600) / 60,
            start % 60,
            end / 3600,
            (end % 3600) / 60,
            end % 60,
        ));
        vtt.push_str("Speaker keeps the discussion moving with another remark.\n\n");
    }
    vtt
}

/// Answers immediately with its own prompt
struct EchoLLM;

#[async_trait]
impl LLM for EchoLLM {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        Ok(LLMResponse {
            content: messages.last().map(|m| m.content.clone()).unwrap_or_default(),
            tokens_used: None,
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::LMStudio
    }
}

/// Benchmark boundary coalescing across stream sizes
fn bench_coalesce(c: &mut Criterion) {
    for size in [100u32, 1_000, 10_000] {
        let boundaries = synthetic_boundaries(size);
        c.bench_function(&format!("coalesce_similar_ids_{}", size), |b| {
            b.iter(|| coalesce_similar_ids(black_box(&boundaries)))
        });
    }
}

/// Benchmark turning retained ids into half-open segments
fn bench_segments(c: &mut Criterion) {
    let boundaries = synthetic_boundaries(10_000);
    let ids = coalesce_similar_ids(&boundaries);
    c.bench_function("segments_from_ids_10000", |b| {
        b.iter(|| segments_from_ids(black_box(&ids)))
    });
}

/// Benchmark dominant-topic splitting with different label spreads
fn bench_dominant_split(c: &mut Criterion) {
    for distinct in [2i64, 5] {
        let labels = synthetic_labels(10_000, distinct);
        c.bench_function(&format!("split_dominant_{}_topics", distinct), |b| {
            b.iter(|| split_by_dominant_topics(black_box(&labels), black_box(0.2)))
        });
    }
}

/// Benchmark WebVTT parsing, the entry point for every segmentation run
fn bench_parse_vtt(c: &mut Criterion) {
    for cues in [100usize, 2_000] {
        let vtt = synthetic_vtt(cues);
        c.bench_function(&format!("parse_vtt_{}_cues", cues), |b| {
            b.iter(|| Transcript::parse_vtt(black_box(&vtt)).unwrap())
        });
    }
}

/// Benchmark worker-pool overhead with several prompt batches in flight
fn bench_worker_pool(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("concurrent_prompt_batches", |b| {
        b.iter(|| {
            rt.block_on(async {
                let runner = Arc::new(ChunkSummarizer::new(Arc::new(EchoLLM), 4));

                let batches: Vec<_> = (0..3)
                    .map(|batch| {
                        let runner = Arc::clone(&runner);
                        tokio::spawn(async move {
                            let prompts: Vec<String> =
                                (0..16).map(|i| format!("{}-{}", batch, i)).collect();
                            runner.run_ordered(prompts).await
                        })
                    })
                    .collect();

                black_box(futures::future::join_all(batches).await)
            })
        })
    });
}

criterion_group!(
    benches,
    bench_coalesce,
    bench_segments,
    bench_dominant_split,
    bench_parse_vtt,
    bench_worker_pool
);

criterion_main!(benches);
