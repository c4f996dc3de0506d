use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{NaiveDate, Utc};
use schoolbill_core::{Money, PaymentId, SchoolId, StudentId};
use schoolbill_invoicing::Invoice;

fn invoice_with_pending_payments(count: usize) -> Invoice {
    let (_, mut invoice) = Invoice::of(
        StudentId::new(),
        SchoolId::new(),
        Money::from_cents(10_000_000),
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        Utc::now(),
    );
    for _ in 0..count {
        let (_, next) = invoice
            .add_payment(PaymentId::new(), Money::from_cents(100), Utc::now())
            .unwrap();
        invoice = next;
    }
    invoice
}

/// Admission control sums pending payments on every call; measure how it
/// scales with the number of in-flight payments.
fn bench_add_payment(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_payment");

    for pending in [0usize, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("with_pending_payments", pending),
            pending,
            |b, &size| {
                let invoice = invoice_with_pending_payments(size);
                b.iter(|| {
                    black_box(
                        invoice
                            .add_payment(PaymentId::new(), black_box(Money::from_cents(100)), Utc::now())
                            .unwrap(),
                    );
                });
            },
        );
    }

    group.finish();
}

fn bench_succeed_payment(c: &mut Criterion) {
    let mut group = c.benchmark_group("succeed_payment");

    for pending in [1usize, 10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::new("replace_in_place", pending),
            pending,
            |b, &size| {
                let invoice = invoice_with_pending_payments(size);
                let target = invoice.payments()[size / 2].id();
                b.iter(|| black_box(invoice.succeed_payment(target, Utc::now()).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_add_payment, bench_succeed_payment);
criterion_main!(benches);
