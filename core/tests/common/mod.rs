// Shared fixtures for guoxue-core integration tests.
#![allow(dead_code)]

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use guoxue_core::{DatasetSource, Idiom, IdiomStore, Result};

/// (word, pinyin) rows of the fixture table, in table order.
pub const IDIOMS: &[(&str, &str)] = &[
    ("一马当先", "yī mǎ dāng xiān"),
    ("先声夺人", "xiān shēng duó rén"),
    ("先见之明", "xiān jiàn zhī míng"),
    ("先发制人", "xiān fā zhì rén"),
    ("先睹为快", "xiān dǔ wéi kuài"),
    ("人山人海", "rén shān rén hǎi"),
    ("人云亦云", "rén yún yì yún"),
    ("海阔天空", "hǎi kuò tiān kōng"),
    ("空前绝后", "kōng qián jué hòu"),
    ("万里挑一", "wàn lǐ tiāo yī"),
    ("一心一意", "yī xīn yī yì"),
    ("意气风发", "yì qì fēng fā"),
];

pub fn idiom(word: &str, pinyin: &str) -> Idiom {
    Idiom {
        word: word.to_string(),
        pinyin: pinyin.to_string(),
        explanation: format!("{}：释义", word),
        derivation: format!("{}：出处", word),
        example: String::new(),
    }
}

pub fn fixture_idioms() -> Vec<Idiom> {
    IDIOMS.iter().map(|(w, p)| idiom(w, p)).collect()
}

/// In-memory store over the fixture table.
pub fn fixture_store() -> IdiomStore {
    IdiomStore::from_idioms(&fixture_idioms()).expect("fixture store")
}

/// Write a SQLite file laid out like the bundled idiom database.
pub fn write_idiom_db(path: &Path, rows: &[(&str, &str)]) {
    let conn = rusqlite::Connection::open(path).expect("open sqlite file");
    conn.execute_batch(
        "CREATE TABLE idiom (
            char1 TEXT, char2 TEXT, char3 TEXT, char4 TEXT,
            py1 TEXT, py2 TEXT, py3 TEXT, py4 TEXT,
            mean TEXT, source TEXT, example TEXT
        )",
    )
    .expect("create table");
    for (word, pinyin) in rows {
        let c: Vec<String> = word.chars().map(String::from).collect();
        let p: Vec<&str> = pinyin.split(' ').collect();
        conn.execute(
            "INSERT INTO idiom VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL)",
            rusqlite::params![c[0], c[1], c[2], c[3], p[0], p[1], p[2], p[3], format!("{}：释义", word)],
        )
        .expect("insert row");
    }
}

/// Bytes of a SQLite file holding `rows`.
pub fn idiom_db_bytes(rows: &[(&str, &str)]) -> Vec<u8> {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("idioms.db");
    write_idiom_db(&path, rows);
    std::fs::read(&path).expect("read sqlite file")
}

/// A source that serves fixed bytes and counts how often it is fetched.
/// An empty payload fails like a missing file.
#[derive(Clone)]
pub struct CountingSource {
    payload: Rc<std::cell::RefCell<Vec<u8>>>,
    fetches: Rc<Cell<usize>>,
}

impl CountingSource {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload: Rc::new(std::cell::RefCell::new(payload)),
            fetches: Rc::new(Cell::new(0)),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }

    /// Swap what later fetches return.
    pub fn set_payload(&self, payload: Vec<u8>) {
        *self.payload.borrow_mut() = payload;
    }
}

impl DatasetSource for CountingSource {
    fn fetch(&self) -> Result<Vec<u8>> {
        self.fetches.set(self.fetches.get() + 1);
        let payload = self.payload.borrow().clone();
        if payload.is_empty() {
            return Err(guoxue_core::Error::Load("fixture source offline".into()));
        }
        Ok(payload)
    }

    fn describe(&self) -> String {
        "fixture".to_string()
    }
}

pub const WORD_JSON: &str = r#"[
  {"word":"吖","oldword":"吖","strokes":"6","pinyin":"ā","radicals":"口","explanation":"吖 ā 〔吖嗪〕有机化合物的一类。","more":"吖 a"},
  {"word":"马","oldword":"馬","strokes":"3","pinyin":"mǎ","radicals":"马","explanation":"马 mǎ 哺乳动物。","more":""},
  {"word":"骂","oldword":"罵","strokes":"9","pinyin":"mà","radicals":"马","explanation":"骂 mà 用粗野或恶意的话侮辱人。","more":""}
]"#;

pub const CI_JSON: &str = r#"[
  {"ci":"天下","explanation":"指全中国或全世界。"},
  {"ci":"天空","explanation":"日月星辰罗列的广大空间。"},
  {"ci":"海天","explanation":"大海与天空。"}
]"#;

pub const XIEHOUYU_JSON: &str = r#"[
  {"riddle":"外甥打灯笼","answer":"照舅（旧）"},
  {"riddle":"孔夫子搬家","answer":"净是书（输）"},
  {"riddle":"竹篮打水","answer":"一场空"}
]"#;
