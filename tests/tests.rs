use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use csvstream::{
    Terminator, Tokenizer, TokenizerBuilder, Writer, WriterBuilder,
};
use quickcheck::{quickcheck, TestResult};

fn write_all(records: &[Vec<String>]) -> Vec<u8> {
    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(vec![]);
    for record in records {
        wtr.write_record(record).unwrap();
    }
    wtr.into_inner().unwrap()
}

fn parse_all<R: io::Read>(mut tok: Tokenizer<R>) -> Vec<Vec<String>> {
    tok.records().map(|r| r.unwrap().into_values()).collect()
}

#[test]
fn roundtrip_one_record() {
    fn prop(record: Vec<String>) -> TestResult {
        if record.is_empty() {
            return TestResult::discard();
        }
        let data = write_all(&[record.clone()]);
        let got = parse_all(Tokenizer::from_reader(&*data));
        TestResult::from_bool(got == vec![record])
    }
    quickcheck(prop as fn(Vec<String>) -> TestResult);
}

#[test]
fn roundtrip_many_records_small_buffer() {
    fn prop(records: Vec<Vec<String>>, capacity: u8) -> TestResult {
        if records.iter().any(|r| r.is_empty()) {
            return TestResult::discard();
        }
        let data = write_all(&records);
        let tok = TokenizerBuilder::new()
            .buffer_capacity(capacity as usize % 16)
            .from_reader(&*data);
        TestResult::from_bool(parse_all(tok) == records)
    }
    quickcheck(prop as fn(Vec<Vec<String>>, u8) -> TestResult);
}

#[test]
fn roundtrip_crlf_and_custom_dialect() {
    let records: Vec<Vec<String>> = vec![
        vec!["a;b".into(), " lead".into(), "tr\tail\t".into()],
        vec!["it's".into(), "line\r\nbreak".into(), "".into()],
    ];
    let mut wtr = WriterBuilder::new()
        .value_separator(b';')
        .unwrap()
        .value_delimiter(Some(b'\''))
        .unwrap()
        .terminator(Terminator::CRLF)
        .from_writer(vec![]);
    for record in &records {
        wtr.write_record(record).unwrap();
    }
    let data = wtr.into_inner().unwrap();

    let tok = TokenizerBuilder::new()
        .value_separator(b';')
        .unwrap()
        .value_delimiter(Some(b'\''))
        .unwrap()
        .buffer_capacity(4)
        .from_reader(&*data);
    assert_eq!(parse_all(tok), records);
}

/// A reader that hands out its input in a fixed sequence of chunk sizes,
/// regardless of how much room the caller offers.
#[derive(Debug)]
struct ChunkReader<'a> {
    data: &'a [u8],
    sizes: Vec<usize>,
    next: usize,
}

impl<'a> Read for ChunkReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = if self.sizes.is_empty() {
            self.data.len()
        } else {
            self.sizes[self.next % self.sizes.len()]
        };
        self.next += 1;
        let len = size.min(buf.len()).min(self.data.len());
        buf[..len].copy_from_slice(&self.data[..len]);
        self.data = &self.data[len..];
        Ok(len)
    }
}

#[test]
fn short_reads() {
    let data = "\
col_a,col_b,col_c
0aaaa,\"0b\"\"bbb\",0cccc\r
1aaaa,1bbbb,\"1c
ccc\"
2aaaa,  2bbbb  ,2cccc";
    let expected = vec![
        vec!["col_a", "col_b", "col_c"],
        vec!["0aaaa", "0b\"bbb", "0cccc"],
        vec!["1aaaa", "1bbbb", "1c\nccc"],
        vec!["2aaaa", "2bbbb", "2cccc"],
    ];
    for sizes in &[vec![1], vec![2, 5], vec![3, 1, 4, 1, 5, 9], vec![]] {
        let rdr = ChunkReader {
            data: data.as_bytes(),
            sizes: sizes.clone(),
            next: 0,
        };
        let got = parse_all(Tokenizer::from_reader(rdr));
        assert_eq!(got, expected, "chunk sizes {:?}", sizes);
    }
}

#[test]
fn skip_header_then_read() {
    let data = "name,age\n\"Smith, J\",42\nDoe,7\n";
    let mut tok = Tokenizer::from_reader(data.as_bytes());
    assert_eq!(tok.skip_records(1).unwrap(), 1);
    let mut out = vec![None, None, None];
    assert_eq!(tok.parse_records(None, &mut out).unwrap(), 2);
    let first = out[0].take().unwrap();
    assert_eq!(first.into_values(), vec!["Smith, J", "42"]);
    assert!(!tok.has_more_records().unwrap());
}

#[test]
fn files() {
    let path = env::temp_dir()
        .join(format!("csvstream-files-{}.csv", process::id()));
    {
        let mut wtr = Writer::from_path(&path).unwrap();
        wtr.set_terminator(Terminator::Any(b'\n')).unwrap();
        wtr.write_record(&["a", "b c", "d,e"]).unwrap();
        wtr.close().unwrap();
    }
    assert_eq!(fs::read_to_string(&path).unwrap(), "a,b c,\"d,e\"\n");

    let tok = Tokenizer::from_path(&path).unwrap();
    assert_eq!(parse_all(tok), vec![vec!["a", "b c", "d,e"]]);
    fs::remove_file(&path).unwrap();
}

#[cfg(feature = "serde")]
#[test]
fn config_from_json() {
    use csvstream::ParserConfig;

    let config: ParserConfig = serde_json::from_str(
        r#"{"value_separator": 124, "preserve_trailing_whitespace": true}"#,
    )
    .unwrap();
    let tok = Tokenizer::with_config("a |b \n".as_bytes(), config).unwrap();
    assert_eq!(parse_all(tok), vec![vec!["a ", "b "]]);

    let bad: ParserConfig =
        serde_json::from_str(r#"{"value_separator": 32}"#).unwrap();
    let res = Tokenizer::with_config("".as_bytes(), bad);
    assert!(matches!(res, Err(csvstream::Error::Config(_))));
}
