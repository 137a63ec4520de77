//! Filter compilation and schema diff benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ormsql_core::{
    Condition, ConditionTree, FieldInfo, Filter, FilterCompiler, IndexDef, IndexEntry,
    IntrospectedTable, ModelSchema, OrderSpec, PropertyDef, PropertyType, SchemaDiffer,
};
use serde_json::json;

fn model(columns: usize) -> ModelSchema {
    let mut model = ModelSchema::new("bench_user")
        .with_property(PropertyDef::new("name", PropertyType::String).not_null().with_index())
        .with_property(PropertyDef::new("age", PropertyType::Number))
        .with_property(PropertyDef::new("joined", PropertyType::Date))
        .with_index(IndexDef::new("name_age", ["name", "age"]));
    for i in 0..columns {
        model = model.with_property(PropertyDef::new(format!("extra_{i}"), PropertyType::String));
    }
    model
}

fn bench_compile_where(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/where");
    let model = model(0);
    let compiler = FilterCompiler::new(&model);

    group.bench_function("eq", |b| {
        let tree = ConditionTree::new().eq("name", "Alice_0");
        b.iter(|| black_box(compiler.compile_where(&tree).unwrap()));
    });

    group.bench_function("mixed", |b| {
        let tree = ConditionTree::new()
            .with("age", Condition::between(18i64, 65i64))
            .with("name", Condition::like("A%"))
            .or(vec![
                ConditionTree::new().eq("age", 30i64),
                ConditionTree::new().with("joined", Condition::gt("2020-01-01")),
            ]);
        b.iter(|| black_box(compiler.compile_where(&tree).unwrap()));
    });

    for size in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("inq", size), &size, |b, &size| {
            let tree = ConditionTree::new().with("age", Condition::inq(0..size as i64));
            b.iter(|| black_box(compiler.compile_where(&tree).unwrap()));
        });
    }

    group.finish();
}

fn bench_compile_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/select");
    let model = model(0);
    let compiler = FilterCompiler::new(&model);

    group.bench_function("typed", |b| {
        let filter = Filter::new()
            .with_where(ConditionTree::new().with("age", Condition::gt(18i64)))
            .order_by(OrderSpec::desc("name"))
            .with_limit(10)
            .with_skip(5);
        b.iter(|| black_box(compiler.compile_select(&filter).unwrap()));
    });

    group.bench_function("from_json", |b| {
        let raw = json!({
            "where": {"age": {"gt": 18}, "or": [{"name": "a"}, {"name": "b"}]},
            "order": "name DESC",
            "limit": 10
        });
        b.iter(|| {
            let filter = Filter::from_json(&raw).unwrap();
            black_box(compiler.compile_select(&filter).unwrap())
        });
    });

    group.finish();
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("migration/diff");

    for columns in [10usize, 100] {
        let model = model(columns);
        let mut fields = vec![FieldInfo::new("id", "int(11)", false)];
        fields.push(FieldInfo::new("name", "varchar(255)", false));
        fields.push(FieldInfo::new("age", "varchar(20)", true));
        for i in 0..columns / 2 {
            fields.push(FieldInfo::new(format!("extra_{i}"), "varchar(255)", true));
        }
        let live = IntrospectedTable::new(fields, vec![IndexEntry::new("PRIMARY", "id", 1)]);

        group.bench_with_input(BenchmarkId::new("alter", columns), &live, |b, live| {
            let differ = SchemaDiffer::new(&model);
            b.iter(|| black_box(differ.diff(Some(live)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("create", columns), &model, |b, model| {
            let differ = SchemaDiffer::new(model);
            b.iter(|| black_box(differ.diff(None).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile_where, bench_compile_select, bench_diff);
criterion_main!(benches);
