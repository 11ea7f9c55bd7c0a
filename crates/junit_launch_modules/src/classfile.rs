//! Minimal reader for compiled module declarations (`module-info.class`).
//!
//! Only what classification needs is decoded: the module name and flags, `requires`, the packages named by
//! `exports`/`opens`, and the `ModulePackages` attribute. Everything else is skipped by length.

use std::collections::BTreeSet;

use crate::descriptor::ModuleDescriptor;
use crate::error::MalformedModule;

const MAGIC: u32 = 0xCAFE_BABE;
const ACC_OPEN: u16 = 0x0020;

const CONSTANT_UTF8: u8 = 1;
const CONSTANT_MODULE: u8 = 19;
const CONSTANT_PACKAGE: u8 = 20;

/// A decoded constant pool slot. Only strings and module/package references are kept.
#[derive(Debug, Clone)]
enum Constant {
    Unused,
    Utf8(String),
    Module(u16),
    Package(u16),
    Other,
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], MalformedModule> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(MalformedModule::Truncated { offset: self.offset })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u1(&mut self) -> Result<u8, MalformedModule> {
        Ok(self.take(1)?[0])
    }

    fn u2(&mut self) -> Result<u16, MalformedModule> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32, MalformedModule> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn skip(&mut self, len: usize) -> Result<(), MalformedModule> {
        self.take(len).map(|_| ())
    }

    /// Skip a `u2` count followed by `count * width` bytes.
    fn skip_table(&mut self, width: usize) -> Result<(), MalformedModule> {
        let count = self.u2()? as usize;
        self.skip(count * width)
    }
}

struct ConstantPool(Vec<Constant>);

impl ConstantPool {
    fn read(reader: &mut Reader<'_>) -> Result<Self, MalformedModule> {
        let count = reader.u2()?;
        let mut constants = vec![Constant::Unused; count as usize];
        let mut index = 1u16;
        while index < count {
            let tag = reader.u1()?;
            let mut slots = 1;
            let constant = match tag {
                CONSTANT_UTF8 => {
                    let len = reader.u2()? as usize;
                    // Modified UTF-8 agrees with UTF-8 for every legal module and package name.
                    Constant::Utf8(String::from_utf8_lossy(reader.take(len)?).into_owned())
                }
                CONSTANT_MODULE => Constant::Module(reader.u2()?),
                CONSTANT_PACKAGE => Constant::Package(reader.u2()?),
                // Integer, Float
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                // Long, Double take two slots
                5 | 6 => {
                    reader.skip(8)?;
                    slots = 2;
                    Constant::Other
                }
                // Class, String, MethodType
                7 | 8 | 16 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                // Field/Method/InterfaceMethod refs, NameAndType, Dynamic, InvokeDynamic
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                // MethodHandle
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                tag => return Err(MalformedModule::UnknownConstantTag { tag, index }),
            };
            constants[index as usize] = constant;
            index = index.saturating_add(slots);
        }
        Ok(Self(constants))
    }

    fn get(&self, index: u16) -> Option<&Constant> {
        self.0.get(index as usize)
    }

    fn utf8(&self, index: u16) -> Result<&str, MalformedModule> {
        match self.get(index) {
            Some(Constant::Utf8(value)) => Ok(value),
            _ => Err(MalformedModule::BadConstant { index, expected: "Utf8" }),
        }
    }

    fn module_name(&self, index: u16) -> Result<String, MalformedModule> {
        match self.get(index) {
            Some(Constant::Module(name)) => Ok(self.utf8(*name)?.to_string()),
            _ => Err(MalformedModule::BadConstant { index, expected: "Module" }),
        }
    }

    /// Package names are stored in internal form (`a/b/c`).
    fn package_name(&self, index: u16) -> Result<String, MalformedModule> {
        match self.get(index) {
            Some(Constant::Package(name)) => Ok(self.utf8(*name)?.replace('/', ".")),
            _ => Err(MalformedModule::BadConstant { index, expected: "Package" }),
        }
    }
}

/// Decode a `module-info.class`.
///
/// ## Parameters
/// - `bytes`: the raw class file.
///
/// ## Returns
/// - The explicit module descriptor. Its `packages` hold the `ModulePackages` attribute plus every package named by
///   an `exports` or `opens` directive; callers that can see the module's content add the packages they find there.
///
/// ## Errors
/// - [`MalformedModule`] when the bytes are not a module declaration.
pub fn parse_module_info(bytes: &[u8]) -> Result<ModuleDescriptor, MalformedModule> {
    let mut reader = Reader::new(bytes);
    let magic = reader.u4()?;
    if magic != MAGIC {
        return Err(MalformedModule::BadMagic(magic));
    }
    reader.skip(4)?; // minor + major version
    let pool = ConstantPool::read(&mut reader)?;
    reader.skip(6)?; // access flags, this_class, super_class
    reader.skip_table(2)?; // interfaces
    skip_members(&mut reader)?; // fields
    skip_members(&mut reader)?; // methods

    let mut module: Option<ModuleDescriptor> = None;
    let mut packages = BTreeSet::new();
    let attributes = reader.u2()?;
    for _ in 0..attributes {
        let name = pool.utf8(reader.u2()?)?.to_string();
        let len = reader.u4()? as usize;
        let body = reader.take(len)?;
        match name.as_str() {
            "Module" => module = Some(read_module_attribute(&mut Reader::new(body), &pool)?),
            "ModulePackages" => {
                let mut body = Reader::new(body);
                for _ in 0..body.u2()? {
                    packages.insert(pool.package_name(body.u2()?)?);
                }
            }
            _ => {}
        }
    }

    let mut module = module.ok_or(MalformedModule::MissingModuleAttribute)?;
    module.packages.extend(packages);
    Ok(module)
}

fn skip_members(reader: &mut Reader<'_>) -> Result<(), MalformedModule> {
    let count = reader.u2()?;
    for _ in 0..count {
        reader.skip(6)?; // access flags, name, descriptor
        let attributes = reader.u2()?;
        for _ in 0..attributes {
            reader.skip(2)?;
            let len = reader.u4()? as usize;
            reader.skip(len)?;
        }
    }
    Ok(())
}

fn read_module_attribute(reader: &mut Reader<'_>, pool: &ConstantPool) -> Result<ModuleDescriptor, MalformedModule> {
    let name = pool.module_name(reader.u2()?)?;
    let flags = reader.u2()?;
    reader.skip(2)?; // version

    let mut requires = Vec::new();
    for _ in 0..reader.u2()? {
        requires.push(pool.module_name(reader.u2()?)?);
        reader.skip(4)?; // flags, version
    }

    let mut packages = BTreeSet::new();
    // exports, then opens: both are (package, flags, targets[])
    for _ in 0..2 {
        for _ in 0..reader.u2()? {
            packages.insert(pool.package_name(reader.u2()?)?);
            reader.skip(2)?;
            reader.skip_table(2)?;
        }
    }
    // uses and provides carry no packages we track
    reader.skip_table(2)?;
    for _ in 0..reader.u2()? {
        reader.skip(2)?;
        reader.skip_table(2)?;
    }

    Ok(ModuleDescriptor {
        name,
        packages,
        is_open: flags & ACC_OPEN != 0,
        is_automatic: false,
        requires,
    })
}
