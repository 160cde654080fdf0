#![allow(missing_docs)]
use criterion::{Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use helm_core::arguments::integer::IntegerArgument;
use helm_core::builder::{argument, literal};
use helm_core::dispatcher::CommandDispatcher;
use std::hint::black_box;

fn build_dispatcher() -> CommandDispatcher<()> {
    let mut dispatcher = CommandDispatcher::new();
    dispatcher.register(
        literal("teleport")
            .then(
                argument("x", IntegerArgument::new()).then(
                    argument("y", IntegerArgument::new())
                        .then(argument("z", IntegerArgument::new()).executes(|_| Ok(1))),
                ),
            )
            .then(literal("home").executes(|_| Ok(2))),
    );
    dispatcher.register(literal("help").executes(|_| Ok(0)));
    let root = dispatcher.root();
    dispatcher.register(literal("repeat").redirect(root));
    dispatcher
}

fn bench_parse(c: &mut Criterion) {
    let dispatcher = build_dispatcher();
    c.bench_function("parse literal path", |b| {
        b.iter(|| block_on(dispatcher.parse(black_box("teleport home"), ())));
    });
    c.bench_function("parse argument path", |b| {
        b.iter(|| block_on(dispatcher.parse(black_box("teleport 1 -20 300"), ())));
    });
    c.bench_function("parse through redirect", |b| {
        b.iter(|| block_on(dispatcher.parse(black_box("repeat teleport home"), ())));
    });
}

fn bench_suggest(c: &mut Criterion) {
    let dispatcher = build_dispatcher();
    c.bench_function("suggest at root", |b| {
        b.iter(|| {
            block_on(async {
                let parse = dispatcher.parse(black_box("te"), ()).await;
                dispatcher.get_completion_suggestions(&parse, 2).await
            })
        });
    });
}

criterion_group!(benches, bench_parse, bench_suggest);
criterion_main!(benches);
