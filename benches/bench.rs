// Criterion benchmarks for Program Match

use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use program_match::core::{Matcher, cosine_similarity, filters::filter_candidates, normalize_grades};
use program_match::models::{CatalogSnapshot, Filters, GradeProfile, GradeSet, ProgramRecord, RankedSchool, RankingTable};
use std::collections::HashMap;

const DIMENSION: usize = 768;
const CATEGORIES: [&str; 4] = ["IT", "Nursing", "Engineering", "Business"];

fn create_vector(seed: usize) -> Vec<f32> {
    (0..DIMENSION)
        .map(|i| (((seed * 31 + i * 17) % 97) as f32 / 97.0) - 0.5)
        .collect()
}

fn create_program(id: usize) -> ProgramRecord {
    ProgramRecord {
        school: format!("School {}", id % 50),
        name: format!("Program {}", id),
        vector: Some(create_vector(id)),
        category: Some(CATEGORIES[id % CATEGORIES.len()].to_string()),
        school_type: Some(if id % 2 == 0 { "public" } else { "private" }.to_string()),
        location: Some(if id % 3 == 0 { "Manila" } else { "Cebu" }.to_string()),
        tuition_per_semester: Some(serde_json::json!(20_000 + (id % 10) * 5_000)),
        ..Default::default()
    }
}

fn create_snapshot(programs: usize) -> CatalogSnapshot {
    let mut rankings = RankingTable::new();
    let mut profiles = Vec::new();
    for category in CATEGORIES {
        rankings.insert(
            category.to_string(),
            (0..20)
                .map(|i| RankedSchool {
                    school: format!("School {}", i),
                    rating: 1.0 - i as f64 * 0.05,
                })
                .collect(),
        );
        profiles.push(GradeProfile {
            category: category.to_string(),
            subjects: HashMap::from([
                ("Mathematics".to_string(), 90.0),
                ("English".to_string(), 85.0),
                ("Biology".to_string(), 88.0),
            ]),
        });
    }

    CatalogSnapshot::new((0..programs).map(create_program).collect(), rankings, profiles)
}

fn create_grades() -> GradeSet {
    GradeSet::from([
        ("General Mathematics".to_string(), 94.0),
        ("Oral Communication".to_string(), 89.0),
        ("General Biology 1".to_string(), 91.0),
        ("Physical Education".to_string(), 97.0),
    ])
}

fn bench_cosine_similarity(c: &mut Criterion) {
    let a = create_vector(1);
    let b_vec = create_vector(2);

    c.bench_function("cosine_similarity_768", |b| {
        b.iter(|| cosine_similarity(black_box(&a), black_box(&b_vec)));
    });
}

fn bench_normalize_grades(c: &mut Criterion) {
    let grades = create_grades();

    c.bench_function("normalize_grades", |b| {
        b.iter(|| normalize_grades(black_box(&grades)));
    });
}

fn bench_matching(c: &mut Criterion) {
    let matcher = Matcher::with_defaults();
    let query = create_vector(7);
    let grades = create_grades();
    let filters = Filters::default();

    let mut group = c.benchmark_group("matching");

    for program_count in [100, 500, 1000, 5000].iter() {
        let snapshot = create_snapshot(*program_count);

        group.bench_with_input(
            BenchmarkId::new("match_query", program_count),
            program_count,
            |b, _| {
                b.iter(|| {
                    matcher.match_query(
                        black_box(&query),
                        black_box(Some(&grades)),
                        black_box(&filters),
                        black_box(&snapshot),
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_filtering_pipeline(c: &mut Criterion) {
    let snapshot = create_snapshot(1000);
    let filters = Filters {
        school_type: "private".to_string(),
        locations: vec!["manila".to_string()],
        max_budget: Some(40_000.0),
    };

    c.bench_function("filtering_pipeline_1000_programs", |b| {
        b.iter(|| black_box(filter_candidates(black_box(&snapshot.programs), &filters)).len());
    });
}

criterion_group!(
    benches,
    bench_cosine_similarity,
    bench_normalize_grades,
    bench_matching,
    bench_filtering_pipeline
);

criterion_main!(benches);
