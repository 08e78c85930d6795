use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cylc_language_server::lint::rules::classify_line;
use cylc_language_server::lint::DEFAULT_MAX_LINE_LENGTH;
use cylc_language_server::lint_text;
use std::hint::black_box;

/// Generate a workflow with `tasks` runtime namespaces in a given style
fn generate_workflow(tasks: usize, pattern: &str) -> String {
    let mut content = String::from("[meta]\n    title = \"benchmark\"\n[scheduling]\n");
    content.push_str("    [[graph]]\n        R1 = \"\"\"\n");
    for i in 1..tasks {
        content.push_str(&format!("            task_{} => task_{}\n", i - 1, i));
    }
    content.push_str("        \"\"\"\n[runtime]\n");

    for i in 0..tasks {
        match pattern {
            "clean" => {
                content.push_str(&format!("    [[task_{}]]\n", i));
                content.push_str(&format!("        script = echo {}\n", i));
                content.push_str("        [[[environment]]]\n");
                content.push_str(&format!("            INDEX = {}\n", i));
            }
            "messy" => {
                content.push_str(&format!("  [[task_{}]]\n", i));
                content.push_str(&format!("script = echo {}   \n", i));
                content.push_str("\t[[[environment]]]\n");
                content.push_str(&format!(
                    "            INDEX = {}{}\n",
                    i,
                    " # padding".repeat(15)
                ));
            }
            _ => {
                content.push_str(&format!("    [[task_{}]]\n", i));
                content.push_str("        # no settings\n");
            }
        }
    }

    content
}

fn bench_line_classification(c: &mut Criterion) {
    let test_lines = vec![
        ("section", "    [[task_1]]"),
        ("setting", "        script = echo hello"),
        ("graph_arrow", "            foo => bar & baz"),
        ("comment", "# a comment line"),
        ("template", "{% for i in range(10) %}"),
    ];

    let mut group = c.benchmark_group("line_classification");

    for (name, line) in test_lines {
        group.bench_with_input(BenchmarkId::new("classify_line", name), &line, |b, line| {
            b.iter(|| black_box(classify_line(black_box(line))))
        });
    }

    group.finish();
}

fn bench_workflow_linting(c: &mut Criterion) {
    let sizes = vec![10, 100, 1_000];
    let patterns = vec!["clean", "messy", "sparse"];

    let mut group = c.benchmark_group("workflow_linting");

    for &size in &sizes {
        for pattern in &patterns {
            let content = generate_workflow(size, pattern);

            group.throughput(Throughput::Bytes(content.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(*pattern, size),
                &content,
                |b, content| {
                    b.iter(|| black_box(lint_text(black_box(content), DEFAULT_MAX_LINE_LENGTH)))
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_line_classification, bench_workflow_linting);
criterion_main!(benches);
