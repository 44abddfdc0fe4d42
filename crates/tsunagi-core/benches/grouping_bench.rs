use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tsunagi_core::{AnimeRecord, GroupingConfig, NamingResolver, SeriesGrouper, SeriesSplitter};

/// Franchises of ten entries linked as sequel chains, with a character link
/// from every fifth entry into the next franchise.
fn catalog(franchises: u64) -> Vec<AnimeRecord> {
    let mut records = Vec::new();
    for f in 0..franchises {
        let base = f * 10;
        for n in 0..10 {
            let id = base + n;
            let mut record = AnimeRecord::new(id)
                .with_title(format!("Franchise {f}"))
                .with_release_date(format!("{}-01-01", 1990 + n));
            if n > 0 {
                record = record.with_relation(id - 1, "PREQUEL");
            }
            if n < 9 {
                record = record.with_relation(id + 1, "SEQUEL");
            }
            if n == 5 {
                record = record.with_relation(base + 10, "CHARACTER");
            }
            records.push(record);
        }
    }
    records
}

fn bench_grouping(c: &mut Criterion) {
    let records = catalog(500);
    let grouper = SeriesGrouper::new(GroupingConfig::default());

    c.bench_function("group_5000_records", |b| {
        b.iter(|| {
            let mut batch = records.clone();
            grouper.group(black_box(&mut batch)).unwrap()
        });
    });

    let mut grouped = records.clone();
    let outcome = grouper.group(&mut grouped).unwrap();
    let resolver = NamingResolver::from_records(&grouped);

    c.bench_function("split_5000_records", |b| {
        b.iter(|| SeriesSplitter::new(&resolver).split(black_box(&outcome.groups)));
    });
}

criterion_group!(benches, bench_grouping);
criterion_main!(benches);
