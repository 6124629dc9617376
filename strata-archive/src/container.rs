use std::collections::{HashSet, VecDeque};
use std::ffi::CStr;
use std::io::{Cursor, Read};
use std::ops::Range;

use byteorder::{LittleEndian, ReadBytesExt};
use log::trace;

use crate::error::ArchiveError;

pub const FOURCC_SARC: [u8; 4] = *b"SARC";
pub(crate) const HEADER_SIZE: usize = 32;
pub(crate) const NODE_SIZE: usize = 20;
pub(crate) const NODE_FLAG_DIRECTORY: u16 = 0x1;

#[derive(Debug, Copy, Clone)]
struct ContainerHeader {
    total_size: u32,
    node_offset: u32,
    node_count: u32,
    string_offset: u32,
    string_size: u32,
    data_offset: u32,
    data_size: u32,
}

impl ContainerHeader {
    fn read(buffer: &[u8]) -> Result<ContainerHeader, ArchiveError> {
        if buffer.len() < HEADER_SIZE {
            return Err(ArchiveError::Truncated {
                what: "archive header",
            });
        }

        let mut rdr = Cursor::new(buffer);
        let mut magic = [0u8; 4];
        rdr.read_exact(&mut magic)?;
        if magic != FOURCC_SARC {
            return Err(ArchiveError::InvalidMagic {
                expected: FOURCC_SARC,
                found: magic,
            });
        }

        Ok(ContainerHeader {
            total_size: rdr.read_u32::<LittleEndian>()?,
            node_offset: rdr.read_u32::<LittleEndian>()?,
            node_count: rdr.read_u32::<LittleEndian>()?,
            string_offset: rdr.read_u32::<LittleEndian>()?,
            string_size: rdr.read_u32::<LittleEndian>()?,
            data_offset: rdr.read_u32::<LittleEndian>()?,
            data_size: rdr.read_u32::<LittleEndian>()?,
        })
    }

    fn section(&self, what: &'static str, offset: u32, length: u64) -> Result<Range<usize>, ArchiveError> {
        let end = offset as u64 + length;
        if end > self.total_size as u64 {
            return Err(ArchiveError::InvalidRange {
                what,
                offset: offset as u64,
                length,
                limit: self.total_size as u64,
            });
        }

        Ok(offset as usize..end as usize)
    }
}

#[derive(Debug, Copy, Clone)]
struct RawNode {
    flags: u16,
    name_offset: u32,
    type_tag: [u8; 4],
    /// directory: first child, file: offset into the data section
    a: u32,
    /// directory: child count, file: length
    b: u32,
}

impl RawNode {
    fn read<R: Read>(rdr: &mut R) -> Result<RawNode, ArchiveError> {
        let flags = rdr.read_u16::<LittleEndian>()?;
        let _reserved = rdr.read_u16::<LittleEndian>()?;
        let name_offset = rdr.read_u32::<LittleEndian>()?;
        let mut type_tag = [0u8; 4];
        rdr.read_exact(&mut type_tag)?;

        Ok(RawNode {
            flags,
            name_offset,
            type_tag,
            a: rdr.read_u32::<LittleEndian>()?,
            b: rdr.read_u32::<LittleEndian>()?,
        })
    }

    fn is_directory(&self) -> bool {
        self.flags & NODE_FLAG_DIRECTORY != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    /// `/`-separated path from the root, without a leading slash.
    pub path: String,
    pub type_tag: [u8; 4],
    /// Absolute offset into the container's buffer.
    pub offset: usize,
    pub length: usize,
    /// Index into [`Container::directories`].
    pub directory: usize,
    node: u32,
}

impl FileEntry {
    pub fn byte_range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }

    /// The name up to the last dot.
    pub fn stem(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map_or(self.name.as_str(), |(stem, _)| stem)
    }

    pub fn extension(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(_, ext)| ext)
    }

    pub fn type_tag_str(&self) -> String {
        self.type_tag.escape_ascii().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct Directory {
    pub name: String,
    pub path: String,
    pub parent: Option<usize>,
    /// Indices into [`Container::entries`], in declaration order.
    pub files: Vec<usize>,
    pub subdirectories: Vec<usize>,
}

/// A parsed SARC archive. Owns the (decompressed) buffer, entries only carry ranges into it.
#[derive(Debug)]
pub struct Container {
    data: Vec<u8>,
    directories: Vec<Directory>,
    entries: Vec<FileEntry>,
}

impl Container {
    pub fn parse(buffer: Vec<u8>) -> Result<Container, ArchiveError> {
        let header = ContainerHeader::read(&buffer)?;
        if header.total_size as usize > buffer.len() {
            return Err(ArchiveError::InvalidRange {
                what: "archive",
                offset: 0,
                length: header.total_size as u64,
                limit: buffer.len() as u64,
            });
        }

        if header.node_count == 0 {
            return Err(ArchiveError::Truncated { what: "node table" });
        }

        let node_range = header.section(
            "node table",
            header.node_offset,
            header.node_count as u64 * NODE_SIZE as u64,
        )?;
        let string_range = header.section("string table", header.string_offset, header.string_size as u64)?;
        let data_range = header.section("data section", header.data_offset, header.data_size as u64)?;

        let mut rdr = Cursor::new(&buffer[node_range]);
        let nodes = (0..header.node_count)
            .map(|_| RawNode::read(&mut rdr))
            .collect::<Result<Vec<_>, _>>()?;

        if !nodes[0].is_directory() {
            return Err(ArchiveError::RootNotDirectory);
        }

        let strings = &buffer[string_range];
        let mut directories = vec![Directory {
            name: read_name(strings, &nodes[0], 0)?,
            path: String::new(),
            parent: None,
            files: Vec::new(),
            subdirectories: Vec::new(),
        }];
        let mut entries: Vec<FileEntry> = Vec::new();

        // Directories are walked breadth first, their child blocks have to follow each other.
        let mut queue = VecDeque::from([(0u32, 0usize)]);
        let mut next_child = 1u32;
        while let Some((node_index, dir_index)) = queue.pop_front() {
            let node = nodes[node_index as usize];
            let (first_child, child_count) = (node.a, node.b);
            if child_count == 0 {
                continue;
            }

            let minimum = next_child.max(node_index + 1);
            if first_child < minimum {
                return Err(ArchiveError::NonMonotonicChild {
                    node: node_index,
                    first_child,
                    minimum,
                });
            }

            let end = first_child as u64 + child_count as u64;
            if end > header.node_count as u64 {
                return Err(ArchiveError::InvalidRange {
                    what: "directory children",
                    offset: first_child as u64,
                    length: child_count as u64,
                    limit: header.node_count as u64,
                });
            }
            next_child = end as u32;

            let mut names = HashSet::new();
            for child_index in first_child..end as u32 {
                let child = nodes[child_index as usize];
                let name = read_name(strings, &child, child_index)?;
                if !names.insert(name.to_ascii_lowercase()) {
                    return Err(ArchiveError::DuplicateName {
                        directory: directories[dir_index].path.clone(),
                        name,
                    });
                }

                let path = match directories[dir_index].path.as_str() {
                    "" => name.clone(),
                    parent => format!("{}/{}", parent, name),
                };

                if child.is_directory() {
                    let index = directories.len();
                    directories.push(Directory {
                        name,
                        path,
                        parent: Some(dir_index),
                        files: Vec::new(),
                        subdirectories: Vec::new(),
                    });
                    directories[dir_index].subdirectories.push(index);
                    queue.push_back((child_index, index));
                    continue;
                }

                let file_end = child.a as u64 + child.b as u64;
                if file_end > header.data_size as u64 {
                    return Err(ArchiveError::InvalidRange {
                        what: "file data",
                        offset: child.a as u64,
                        length: child.b as u64,
                        limit: header.data_size as u64,
                    });
                }

                trace!("{} ({}, {} bytes)", path, child.type_tag.escape_ascii(), child.b);
                directories[dir_index].files.push(entries.len());
                entries.push(FileEntry {
                    name,
                    path,
                    type_tag: child.type_tag,
                    offset: data_range.start + child.a as usize,
                    length: child.b as usize,
                    directory: dir_index,
                    node: child_index,
                });
            }
        }

        Ok(Container {
            data: buffer,
            directories,
            entries,
        })
    }

    /// All files in declaration order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn directories(&self) -> &[Directory] {
        &self.directories
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn file_data(&self, entry: &FileEntry) -> &[u8] {
        &self.data[entry.byte_range()]
    }

    /// Case-insensitive lookup, accepts both `/` and `\` as separators.
    pub fn find(&self, path: &str) -> Option<&FileEntry> {
        let normalized = path.replace('\\', "/");
        let normalized = normalized.trim_start_matches('/');
        self.entries
            .iter()
            .find(|entry| entry.path.eq_ignore_ascii_case(normalized))
    }

    pub fn entries_with_tag(&self, type_tag: [u8; 4]) -> impl Iterator<Item = &FileEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.type_tag == type_tag)
    }

    /// Finds the file next to `entry` that shares its stem and has the given extension. When there
    /// is more than one candidate, the first one in declaration order wins.
    pub fn sibling(&self, entry: &FileEntry, extension: &str) -> Option<&FileEntry> {
        self.directories
            .get(entry.directory)?
            .files
            .iter()
            .map(|&index| &self.entries[index])
            .filter(|candidate| candidate.node != entry.node)
            .find(|candidate| {
                candidate.stem().eq_ignore_ascii_case(entry.stem())
                    && candidate
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            })
    }
}

fn read_name(strings: &[u8], node: &RawNode, node_index: u32) -> Result<String, ArchiveError> {
    let start = node.name_offset as usize;
    if start >= strings.len() {
        return Err(ArchiveError::InvalidName { node: node_index });
    }

    CStr::from_bytes_until_nul(&strings[start..])
        .ok()
        .and_then(|name| name.to_str().ok())
        .map(str::to_owned)
        .ok_or(ArchiveError::InvalidName { node: node_index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ContainerBuilder;

    fn sample() -> Vec<u8> {
        let mut builder = ContainerBuilder::new();
        builder.add_file("field.ttb", *b"TTBL", b"base".to_vec());
        builder.add_file("textures/grass.tex", *b"TXTR", b"grass".to_vec());
        builder.add_file("field.tta", *b"TANM", b"anim".to_vec());
        builder.add_file("textures/rock.tex", *b"TXTR", b"rock!".to_vec());
        builder.add_file("textures/animated/water.tsq", *b"TSEQ", Vec::new());
        builder.build()
    }

    fn patch_u32(buffer: &mut [u8], offset: usize, value: u32) {
        buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn node_field(node: usize, field: usize) -> usize {
        HEADER_SIZE + node * NODE_SIZE + field
    }

    #[test]
    fn parse_directory_tree() -> Result<(), anyhow::Error> {
        let container = Container::parse(sample())?;

        let paths: Vec<&str> = container.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "field.ttb",
                "field.tta",
                "textures/grass.tex",
                "textures/rock.tex",
                "textures/animated/water.tsq"
            ]
        );

        assert_eq!(container.directories().len(), 3);
        assert_eq!(container.directories()[2].path, "textures/animated");
        assert_eq!(container.directories()[2].parent, Some(1));

        let rock = container.find("TEXTURES\\Rock.tex").expect("rock exists");
        assert_eq!(container.file_data(rock), b"rock!");
        assert_eq!(rock.type_tag, *b"TXTR");
        assert_eq!(container.entries_with_tag(*b"TXTR").count(), 2);
        assert!(container.find("water.tsq").is_none());

        Ok(())
    }

    #[test]
    fn sibling_lookup() -> Result<(), anyhow::Error> {
        let container = Container::parse(sample())?;
        let base = container.find("field.ttb").expect("base exists");

        let animation = container.sibling(base, "tta").expect("sibling exists");
        assert_eq!(container.file_data(animation), b"anim");
        assert!(container.sibling(base, "ttm").is_none());
        // siblings never leave their directory
        let grass = container.find("textures/grass.tex").expect("grass exists");
        assert!(container.sibling(grass, "ttb").is_none());

        Ok(())
    }

    #[test]
    fn rejects_non_monotonic_child_index() {
        // node 2 is "textures", its children have to come after the root's three
        let mut buffer = sample();
        patch_u32(&mut buffer, node_field(2, 12), 3);

        assert!(matches!(
            Container::parse(buffer),
            Err(ArchiveError::NonMonotonicChild {
                node: 2,
                first_child: 3,
                ..
            })
        ));
    }

    #[test]
    fn rejects_child_index_pointing_backwards() {
        let mut buffer = sample();
        patch_u32(&mut buffer, node_field(0, 12), 0);

        assert!(matches!(
            Container::parse(buffer),
            Err(ArchiveError::NonMonotonicChild { node: 0, .. })
        ));
    }

    #[test]
    fn rejects_out_of_bounds_ranges() {
        let mut children = sample();
        patch_u32(&mut children, node_field(0, 16), 100);
        assert!(matches!(
            Container::parse(children),
            Err(ArchiveError::InvalidRange {
                what: "directory children",
                ..
            })
        ));

        let mut file = sample();
        // node 1 is field.ttb
        patch_u32(&mut file, node_field(1, 16), 0xFFFF);
        assert!(matches!(
            Container::parse(file),
            Err(ArchiveError::InvalidRange { what: "file data", .. })
        ));

        let mut truncated = sample();
        truncated.truncate(truncated.len() - 1);
        assert!(matches!(
            Container::parse(truncated),
            Err(ArchiveError::InvalidRange { what: "archive", .. })
        ));
    }

    #[test]
    fn rejects_invalid_magic() {
        let mut buffer = sample();
        buffer[0] = b'U';
        assert!(matches!(
            Container::parse(buffer),
            Err(ArchiveError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_names_in_one_directory() {
        let mut builder = ContainerBuilder::new();
        builder.add_file("a/grass.tex", *b"TXTR", Vec::new());
        builder.add_file("b/grass.tex", *b"TXTR", Vec::new());
        assert!(Container::parse(builder.build()).is_ok());

        builder.add_file("a/GRASS.tex", *b"TXTR", Vec::new());
        assert!(matches!(
            Container::parse(builder.build()),
            Err(ArchiveError::DuplicateName { .. })
        ));
    }

    #[test]
    fn empty_archive() -> Result<(), anyhow::Error> {
        let container = Container::parse(ContainerBuilder::new().build())?;
        assert!(container.is_empty());
        assert_eq!(container.directories().len(), 1);
        Ok(())
    }
}
