//! Builds git repositories by writing objects and refs directly, without a git binary

use byteorder::{NetworkEndian, WriteBytesExt};
use fake::Fake;
use fake::faker::internet::en::FreeEmail;
use fake::faker::name::en::Name;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

const BASE_TIMESTAMP: i64 = 1_700_000_000;

pub struct RepoBuilder {
    root: PathBuf,
    git_dir: PathBuf,
    author: String,
    clock: i64,
}

enum Node {
    Blob(String),
    Tree(BTreeMap<String, Node>),
}

impl RepoBuilder {
    /// Create `.git` with `HEAD` pointing at `refs/heads/main`
    pub fn init(root: &Path) -> Self {
        let git_dir = root.join(".git");
        std::fs::create_dir_all(git_dir.join("objects")).expect("Failed to create objects dir");
        std::fs::create_dir_all(git_dir.join("refs/heads")).expect("Failed to create refs dir");
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n")
            .expect("Failed to write HEAD");

        let name: String = Name().fake();
        let email: String = FreeEmail().fake();

        RepoBuilder {
            root: root.to_path_buf(),
            git_dir,
            author: format!("{name} <{email}>"),
            clock: BASE_TIMESTAMP,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Serialize, hash and store a loose object, returning its hex id
    pub fn write_object(&self, object_type: &str, content: &[u8]) -> String {
        let mut serialized = format!("{object_type} {}\0", content.len()).into_bytes();
        serialized.extend_from_slice(content);
        let oid = format!("{:x}", Sha1::digest(&serialized));

        let path = self.git_dir.join("objects").join(&oid[..2]).join(&oid[2..]);
        if !path.exists() {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&serialized).expect("Failed to compress object");
            std::fs::create_dir_all(path.parent().expect("object path has a parent"))
                .expect("Failed to create object dir");
            std::fs::write(&path, encoder.finish().expect("Failed to compress object"))
                .expect("Failed to write object");
        }

        oid
    }

    /// Write the trees for `files` and a commit on top of `parents`
    ///
    /// Every commit is one second newer than the previous one.
    pub fn commit(&mut self, files: &[(&str, &str)], parents: &[&str], message: &str) -> String {
        let mut root = BTreeMap::new();
        for (path, content) in files {
            let segments = path.split('/').collect::<Vec<_>>();
            Self::insert(&mut root, &segments, content);
        }
        let tree = self.write_tree(&root);

        self.clock += 1;
        let mut content = format!("tree {tree}\n");
        for parent in parents {
            content.push_str(&format!("parent {parent}\n"));
        }
        content.push_str(&format!(
            "author {author} {clock} +0000\ncommitter {author} {clock} +0000\n\n{message}\n",
            author = self.author,
            clock = self.clock
        ));

        self.write_object("commit", content.as_bytes())
    }

    pub fn tag(&self, name: &str, target: &str) -> String {
        let content = format!(
            "object {target}\ntype commit\ntag {name}\ntagger {} {} +0000\n\nrelease {name}\n",
            self.author, self.clock
        );
        let oid = self.write_object("tag", content.as_bytes());
        self.set_ref(&format!("refs/tags/{name}"), &oid);

        oid
    }

    fn insert(tree: &mut BTreeMap<String, Node>, segments: &[&str], content: &str) {
        match segments {
            [name] => {
                tree.insert(name.to_string(), Node::Blob(content.to_string()));
            }
            [dir, rest @ ..] => {
                let node = tree
                    .entry(dir.to_string())
                    .or_insert_with(|| Node::Tree(BTreeMap::new()));
                if let Node::Tree(children) = node {
                    Self::insert(children, rest, content);
                }
            }
            [] => {}
        }
    }

    fn write_tree(&self, tree: &BTreeMap<String, Node>) -> String {
        let mut entries = tree
            .iter()
            .map(|(name, node)| match node {
                Node::Blob(content) => (
                    name.clone(),
                    "100644",
                    self.write_object("blob", content.as_bytes()),
                ),
                Node::Tree(children) => (format!("{name}/"), "40000", self.write_tree(children)),
            })
            .collect::<Vec<_>>();
        // git orders subtrees as if their names ended with a slash
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut content = Vec::new();
        for (name, mode, oid) in entries {
            content.extend_from_slice(format!("{mode} {}\0", name.trim_end_matches('/')).as_bytes());
            content.extend_from_slice(&hex_to_raw(&oid));
        }

        self.write_object("tree", &content)
    }

    pub fn set_ref(&self, ref_path: &str, oid: &str) {
        let path = self.git_dir.join(ref_path);
        std::fs::create_dir_all(path.parent().expect("ref path has a parent"))
            .expect("Failed to create ref dir");
        std::fs::write(path, format!("{oid}\n")).expect("Failed to write ref");
    }

    pub fn set_branch(&self, branch: &str, oid: &str) {
        self.set_ref(&format!("refs/heads/{branch}"), oid);
    }

    pub fn set_remote_branch(&self, remote_branch: &str, oid: &str) {
        self.set_ref(&format!("refs/remotes/{remote_branch}"), oid);
    }

    /// Point HEAD at `refs/heads/<branch>`
    pub fn switch(&self, branch: &str) {
        std::fs::write(
            self.git_dir.join("HEAD"),
            format!("ref: refs/heads/{branch}\n"),
        )
        .expect("Failed to write HEAD");
    }

    pub fn detach(&self, oid: &str) {
        std::fs::write(self.git_dir.join("HEAD"), format!("{oid}\n")).expect("Failed to write HEAD");
    }

    /// Register a linked worktree at `path` with `branch` checked out and `files` written
    ///
    /// Mirrors `git worktree add`: the worktree's `.git` file points at
    /// `.git/worktrees/<name>`, which holds its own HEAD and names the shared
    /// git dir in `commondir`.
    pub fn add_worktree(&self, path: &Path, name: &str, branch: &str, files: &[(&str, &str)]) {
        let worktree_git_dir = self.git_dir.join("worktrees").join(name);
        std::fs::create_dir_all(&worktree_git_dir).expect("Failed to create worktree git dir");
        std::fs::create_dir_all(path).expect("Failed to create worktree");
        // `.git` files hold absolute paths
        let worktree_git_dir = worktree_git_dir
            .canonicalize()
            .expect("Failed to resolve worktree git dir");
        let path = path.canonicalize().expect("Failed to resolve worktree");
        std::fs::write(
            worktree_git_dir.join("HEAD"),
            format!("ref: refs/heads/{branch}\n"),
        )
        .expect("Failed to write worktree HEAD");
        std::fs::write(worktree_git_dir.join("commondir"), "../..\n")
            .expect("Failed to write commondir");
        std::fs::write(
            worktree_git_dir.join("gitdir"),
            format!("{}\n", path.join(".git").display()),
        )
        .expect("Failed to write gitdir");

        std::fs::write(
            path.join(".git"),
            format!("gitdir: {}\n", worktree_git_dir.display()),
        )
        .expect("Failed to write .git file");

        for (file, content) in files {
            let file = path.join(file);
            std::fs::create_dir_all(file.parent().expect("file path has a parent"))
                .expect("Failed to create dir");
            std::fs::write(file, content).expect("Failed to write file");
        }
    }

    /// Replace the working tree with `files`
    pub fn checkout_files(&self, files: &[(&str, &str)]) {
        for entry in std::fs::read_dir(&self.root).expect("Failed to list work tree") {
            let path = entry.expect("Failed to read entry").path();
            if path.file_name().is_some_and(|name| name == ".git") {
                continue;
            }
            if path.is_dir() {
                std::fs::remove_dir_all(&path).expect("Failed to clear work tree");
            } else {
                std::fs::remove_file(&path).expect("Failed to clear work tree");
            }
        }

        for (path, content) in files {
            let path = self.root.join(path);
            std::fs::create_dir_all(path.parent().expect("file path has a parent"))
                .expect("Failed to create dir");
            std::fs::write(path, content).expect("Failed to write file");
        }
    }

    /// Move every loose ref under `refs/` into `packed-refs`
    pub fn pack_refs(&self) {
        let refs_dir = self.git_dir.join("refs");
        let mut lines = vec!["# pack-refs with: peeled fully-peeled sorted".to_string()];

        let mut refs = Vec::new();
        collect_files(&refs_dir, &mut refs);
        refs.sort();
        for path in refs {
            let oid = std::fs::read_to_string(&path).expect("Failed to read ref");
            let name = path
                .strip_prefix(&self.git_dir)
                .expect("ref is inside the git dir")
                .components()
                .map(|component| component.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            lines.push(format!("{} {name}", oid.trim()));
            std::fs::remove_file(&path).expect("Failed to remove loose ref");
        }

        std::fs::write(self.git_dir.join("packed-refs"), lines.join("\n") + "\n")
            .expect("Failed to write packed-refs");
    }

    /// Move every loose object into a single undeltified packfile
    pub fn pack_objects(&self) {
        let objects_dir = self.git_dir.join("objects");
        let mut loose = Vec::new();
        collect_files(&objects_dir, &mut loose);
        loose.retain(|path| !path.starts_with(objects_dir.join("pack")));

        let mut objects = loose
            .iter()
            .map(|path| {
                let dir = path.parent().and_then(Path::file_name).expect("object dir");
                let file = path.file_name().expect("object file");
                let oid = format!("{}{}", dir.to_string_lossy(), file.to_string_lossy());
                (oid, inflate(&std::fs::read(path).expect("Failed to read object")))
            })
            .collect::<Vec<_>>();
        objects.sort_by(|a, b| a.0.cmp(&b.0));

        let mut pack = Vec::new();
        pack.extend_from_slice(b"PACK");
        pack.write_u32::<NetworkEndian>(2).expect("write");
        pack.write_u32::<NetworkEndian>(objects.len() as u32).expect("write");

        let mut offsets = Vec::new();
        for (_, serialized) in &objects {
            let header_end = serialized.iter().position(|byte| *byte == 0).expect("header");
            let header = String::from_utf8_lossy(&serialized[..header_end]);
            let type_code = match header.split(' ').next() {
                Some("commit") => 1u8,
                Some("tree") => 2,
                Some("blob") => 3,
                Some("tag") => 4,
                other => panic!("unexpected object type {other:?}"),
            };
            let body = &serialized[header_end + 1..];

            offsets.push(pack.len() as u32);
            let mut size = body.len();
            let mut byte = (type_code << 4) | (size & 0x0f) as u8;
            size >>= 4;
            while size > 0 {
                pack.push(byte | 0x80);
                byte = (size & 0x7f) as u8;
                size >>= 7;
            }
            pack.push(byte);

            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(body).expect("Failed to compress");
            pack.extend_from_slice(&encoder.finish().expect("Failed to compress"));
        }
        let pack_checksum = Sha1::digest(&pack);
        pack.extend_from_slice(&pack_checksum);

        let mut index = Vec::new();
        index.extend_from_slice(b"\xfftOc");
        index.write_u32::<NetworkEndian>(2).expect("write");
        for byte in 0..=255u8 {
            let count = objects
                .iter()
                .filter(|(oid, _)| hex_to_raw(oid)[0] <= byte)
                .count();
            index.write_u32::<NetworkEndian>(count as u32).expect("write");
        }
        for (oid, _) in &objects {
            index.extend_from_slice(&hex_to_raw(oid));
        }
        for _ in &objects {
            index.write_u32::<NetworkEndian>(0).expect("write");
        }
        for offset in &offsets {
            index.write_u32::<NetworkEndian>(*offset).expect("write");
        }
        index.extend_from_slice(&pack_checksum);
        let index_checksum = Sha1::digest(&index);
        index.extend_from_slice(&index_checksum);

        let pack_dir = objects_dir.join("pack");
        std::fs::create_dir_all(&pack_dir).expect("Failed to create pack dir");
        let name = format!("pack-{:x}", pack_checksum);
        std::fs::write(pack_dir.join(format!("{name}.pack")), pack).expect("Failed to write pack");
        std::fs::write(pack_dir.join(format!("{name}.idx")), index).expect("Failed to write idx");

        for path in loose {
            std::fs::remove_file(path).expect("Failed to remove loose object");
        }
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            collect_files(&path, files);
        } else {
            files.push(path);
        }
    }
}

fn inflate(data: &[u8]) -> Vec<u8> {
    use std::io::Read;

    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut inflated = Vec::new();
    decoder.read_to_end(&mut inflated).expect("Failed to inflate object");
    inflated
}

fn hex_to_raw(oid: &str) -> Vec<u8> {
    (0..oid.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&oid[i..i + 2], 16).expect("hex object id"))
        .collect()
}
