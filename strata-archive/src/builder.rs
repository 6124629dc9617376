//! Writers for test fixtures. They produce the layout [`crate::Container::parse`] expects: the root
//! is node 0 and every directory's children form one block, laid out breadth first.

use std::collections::VecDeque;

use crate::compression::compress;
use crate::container::{FOURCC_SARC, HEADER_SIZE, NODE_FLAG_DIRECTORY, NODE_SIZE};

enum Child {
    File {
        name: String,
        type_tag: [u8; 4],
        data: Vec<u8>,
    },
    Directory(usize),
}

struct BuilderDirectory {
    name: String,
    children: Vec<Child>,
}

pub struct ContainerBuilder {
    directories: Vec<BuilderDirectory>,
}

struct Node {
    flags: u16,
    name_offset: u32,
    type_tag: [u8; 4],
    a: u32,
    b: u32,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            directories: vec![BuilderDirectory {
                name: String::new(),
                children: Vec::new(),
            }],
        }
    }

    /// Adds a file, creating intermediate directories on the way. Children keep insertion order.
    pub fn add_file(&mut self, path: &str, type_tag: [u8; 4], data: Vec<u8>) -> &mut Self {
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some(name) = segments.pop() else {
            return self;
        };

        let mut current = 0;
        for segment in segments {
            current = self.directory(current, segment);
        }

        self.directories[current].children.push(Child::File {
            name: name.to_owned(),
            type_tag,
            data,
        });
        self
    }

    fn directory(&mut self, parent: usize, name: &str) -> usize {
        let existing = self.directories[parent]
            .children
            .iter()
            .find_map(|child| match child {
                Child::Directory(index) if self.directories[*index].name == name => Some(*index),
                _ => None,
            });

        existing.unwrap_or_else(|| {
            let index = self.directories.len();
            self.directories.push(BuilderDirectory {
                name: name.to_owned(),
                children: Vec::new(),
            });
            self.directories[parent].children.push(Child::Directory(index));
            index
        })
    }

    pub fn build(&self) -> Vec<u8> {
        let mut strings: Vec<u8> = Vec::new();
        let mut data: Vec<u8> = Vec::new();
        let mut intern = |name: &str| -> u32 {
            let offset = strings.len() as u32;
            strings.extend_from_slice(name.as_bytes());
            strings.push(0);
            offset
        };

        let mut nodes = vec![Node {
            flags: NODE_FLAG_DIRECTORY,
            name_offset: intern(&self.directories[0].name),
            type_tag: [0; 4],
            a: 0,
            b: 0,
        }];

        let mut queue = VecDeque::from([(0usize, 0usize)]);
        while let Some((directory, node_index)) = queue.pop_front() {
            let children = &self.directories[directory].children;
            nodes[node_index].a = nodes.len() as u32;
            nodes[node_index].b = children.len() as u32;

            for child in children {
                match child {
                    Child::File { name, type_tag, data: bytes } => {
                        nodes.push(Node {
                            flags: 0,
                            name_offset: intern(name),
                            type_tag: *type_tag,
                            a: data.len() as u32,
                            b: bytes.len() as u32,
                        });
                        data.extend_from_slice(bytes);
                        // keep file data 4 byte aligned
                        data.resize(data.len().next_multiple_of(4), 0);
                    }
                    Child::Directory(index) => {
                        nodes.push(Node {
                            flags: NODE_FLAG_DIRECTORY,
                            name_offset: intern(&self.directories[*index].name),
                            type_tag: [0; 4],
                            a: 0,
                            b: 0,
                        });
                        queue.push_back((*index, nodes.len() - 1));
                    }
                }
            }
        }

        let node_offset = HEADER_SIZE;
        let string_offset = node_offset + nodes.len() * NODE_SIZE;
        let data_offset = (string_offset + strings.len()).next_multiple_of(4);
        let total_size = data_offset + data.len();

        let mut out = Vec::with_capacity(total_size);
        out.extend_from_slice(&FOURCC_SARC);
        for value in [
            total_size,
            node_offset,
            nodes.len(),
            string_offset,
            strings.len(),
            data_offset,
            data.len(),
        ] {
            out.extend_from_slice(&(value as u32).to_le_bytes());
        }

        for node in &nodes {
            out.extend_from_slice(&node.flags.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&node.name_offset.to_le_bytes());
            out.extend_from_slice(&node.type_tag);
            out.extend_from_slice(&node.a.to_le_bytes());
            out.extend_from_slice(&node.b.to_le_bytes());
        }

        out.extend_from_slice(&strings);
        out.resize(data_offset, 0);
        out.extend_from_slice(&data);
        out
    }

    pub fn build_compressed(&self) -> Vec<u8> {
        compress(&self.build())
    }
}
