use std::io;

use criterion::{
    black_box, criterion_group, criterion_main, Criterion, Throughput,
};
use csvstream::{Terminator, Tokenizer, TokenizerBuilder, WriterBuilder};

/// Plain unquoted rows, where every value is a view into the buffer.
fn plain(rows: usize) -> String {
    let mut data = String::new();
    for i in 0..rows {
        data.push_str(&format!(
            "{},Boston,United States,{},42.3601,-71.0589\n",
            i,
            i * 7
        ));
    }
    data
}

/// Rows with quoting, doubled delimiters and embedded line breaks, which
/// force values to be copied.
fn quoted(rows: usize) -> String {
    let mut data = String::new();
    for i in 0..rows {
        data.push_str(&format!(
            "{},\"Concord, MA\",\"say \"\"hi\"\"\",\"two\r\nlines\", {} \r\n",
            i, i
        ));
    }
    data
}

macro_rules! bench {
    ($c:expr, $name:expr, $data:expr, $counter:ident, $result:expr) => {{
        let data = $data;
        let mut group = $c.benchmark_group($name);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_function(stringify!($counter), |b| {
            b.iter(|| {
                let mut tok = Tokenizer::from_reader(data.as_bytes());
                assert_eq!($counter(&mut tok), $result);
            })
        });
        group.finish();
    }};
}

fn count_parse<R: io::Read>(tok: &mut Tokenizer<R>) -> u64 {
    let mut count = 0;
    while let Some(record) = tok.parse_record(None).unwrap() {
        black_box(&record);
        count += 1;
    }
    count
}

fn count_parse_batch<R: io::Read>(tok: &mut Tokenizer<R>) -> u64 {
    let mut count = 0;
    let mut out = vec![None; 64];
    loop {
        let n = tok.parse_records(None, &mut out).unwrap();
        if n == 0 {
            return count;
        }
        black_box(&out);
        count += n as u64;
    }
}

fn count_skip<R: io::Read>(tok: &mut Tokenizer<R>) -> u64 {
    tok.skip_records(usize::MAX).unwrap() as u64
}

fn tokenize(c: &mut Criterion) {
    bench!(c, "plain", plain(10_000), count_parse, 10_000);
    bench!(c, "plain", plain(10_000), count_parse_batch, 10_000);
    bench!(c, "plain", plain(10_000), count_skip, 10_000);
    bench!(c, "quoted", quoted(10_000), count_parse, 10_000);
    bench!(c, "quoted", quoted(10_000), count_skip, 10_000);
}

fn small_buffer(c: &mut Criterion) {
    let data = quoted(1_000);
    let mut group = c.benchmark_group("small_buffer");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("quoted_64", |b| {
        b.iter(|| {
            let mut tok = TokenizerBuilder::new()
                .buffer_capacity(64)
                .from_reader(data.as_bytes());
            assert_eq!(count_parse(&mut tok), 1_000);
        })
    });
    group.finish();
}

fn write(c: &mut Criterion) {
    let mut tok = Tokenizer::from_reader(io::Cursor::new(quoted(1_000)));
    let records: Vec<Vec<String>> = tok
        .records()
        .map(|r| r.map(|r| r.into_values()))
        .collect::<Result<_, _>>()
        .unwrap();
    let mut group = c.benchmark_group("write");
    group.bench_function("quoted", |b| {
        b.iter(|| {
            let mut wtr = WriterBuilder::new()
                .terminator(Terminator::CRLF)
                .from_writer(io::sink());
            for record in &records {
                wtr.write_record(record).unwrap();
            }
            wtr.flush().unwrap();
        })
    });
    group.finish();
}

criterion_group!(benches, tokenize, small_buffer, write);
criterion_main!(benches);
