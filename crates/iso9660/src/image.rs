//! The `IsoImage` facade and its `Closed -> Initialized` state machine (spec.md §4.8).

use std::io::{Read, Seek, Write};

use crate::boot::{MediaType, PlatformId};
use crate::error::IsoError;
use crate::layout::{self, Layout, LayoutInput};
use crate::mangle::{self, InterchangeLevel};
use crate::parser;
use crate::tree::{ContentId, ContentTable, Tree};
use crate::types::ucs2;
use crate::writer::{self, EltoritoWrite, VolumeIdentity};

/// The Joliet UCS-2 level a [`NewOptions`] requests, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JolietLevel {
    Level1,
    Level2,
    Level3,
}

#[derive(Debug, Clone)]
pub struct NewOptions {
    pub sys_ident: String,
    pub vol_ident: String,
    pub set_ident: String,
    pub seq_num: u16,
    pub log_block_size: u16,
    pub vol_set_size: u16,
    pub publisher_ident: String,
    pub preparer_ident: String,
    pub application_ident: String,
    pub copyright_ident: String,
    pub abstract_ident: String,
    pub bibliographic_ident: String,
    pub app_use: Vec<u8>,
    pub joliet: Option<JolietLevel>,
    pub interchange_level: InterchangeLevel,
}

impl Default for NewOptions {
    fn default() -> Self {
        Self {
            sys_ident: String::new(),
            vol_ident: String::new(),
            set_ident: String::new(),
            seq_num: 1,
            log_block_size: 2048,
            vol_set_size: 1,
            publisher_ident: String::new(),
            preparer_ident: String::new(),
            application_ident: String::new(),
            copyright_ident: String::new(),
            abstract_ident: String::new(),
            bibliographic_ident: String::new(),
            app_use: Vec::new(),
            joliet: None,
            interchange_level: InterchangeLevel::Level1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElToritoOptions {
    pub load_segment: u16,
    pub boot_media_type: MediaType,
    pub platform_id: PlatformId,
}

impl Default for ElToritoOptions {
    fn default() -> Self {
        Self {
            load_segment: 0x07C0,
            boot_media_type: MediaType::NoEmulation,
            platform_id: PlatformId::X80X86,
        }
    }
}

struct EltoritoConfig {
    platform_id: PlatformId,
    media_type: MediaType,
    load_segment: u16,
    boot_content: ContentId,
}

struct Model {
    identity: VolumeIdentity,
    interchange_level: InterchangeLevel,
    pvd_tree: Tree,
    joliet_tree: Option<Tree>,
    content: ContentTable,
    eltorito: Option<EltoritoConfig>,
}

struct Initialized {
    model: Model,
    layout: Option<Layout>,
}

enum State {
    Closed,
    Initialized(Box<Initialized>),
}

/// An ISO 9660 image under construction or freshly parsed.
pub struct IsoImage {
    state: State,
}

impl IsoImage {
    pub fn new(options: NewOptions) -> Self {
        let joliet_tree = options.joliet.map(|_| Tree::new());
        let mut app_use = [0u8; 512];
        let n = options.app_use.len().min(512);
        app_use[..n].copy_from_slice(&options.app_use[..n]);

        let model = Model {
            identity: VolumeIdentity {
                sys_ident: options.sys_ident,
                vol_ident: options.vol_ident,
                set_ident: options.set_ident,
                seq_num: options.seq_num,
                vol_set_size: options.vol_set_size,
                publisher_ident: options.publisher_ident,
                preparer_ident: options.preparer_ident,
                application_ident: options.application_ident,
                copyright_ident: options.copyright_ident,
                abstract_ident: options.abstract_ident,
                bibliographic_ident: options.bibliographic_ident,
                app_use,
            },
            interchange_level: options.interchange_level,
            pvd_tree: Tree::new(),
            joliet_tree,
            content: ContentTable::new(),
            eltorito: None,
        };
        IsoImage {
            state: State::Initialized(Box::new(Initialized { model, layout: None })),
        }
    }

    pub fn open<R: Read + Seek>(src: &mut R) -> Result<Self, IsoError> {
        let parsed = parser::parse(src)?;
        let identity = VolumeIdentity {
            sys_ident: parsed.primary.system_identifier.to_str().to_string(),
            vol_ident: parsed.primary.volume_identifier.to_str().to_string(),
            set_ident: parsed.primary.volume_set_identifier.to_str().to_string(),
            seq_num: parsed.primary.volume_sequence_number.read(),
            vol_set_size: parsed.primary.volume_set_size.read(),
            publisher_ident: parsed.primary.publisher_identifier.to_str().to_string(),
            preparer_ident: parsed.primary.preparer_identifier.to_str().to_string(),
            application_ident: parsed.primary.application_identifier.to_str().to_string(),
            copyright_ident: parsed.primary.copyright_file_identifier.to_str().to_string(),
            abstract_ident: parsed.primary.abstract_file_identifier.to_str().to_string(),
            bibliographic_ident: parsed.primary.bibliographic_file_identifier.to_str().to_string(),
            app_use: parsed.primary.app_data,
        };
        let model = Model {
            identity,
            interchange_level: InterchangeLevel::Level2Relaxed,
            pvd_tree: parsed.pvd_tree,
            joliet_tree: parsed.joliet_tree,
            content: parsed.content,
            eltorito: None,
        };
        Ok(IsoImage {
            state: State::Initialized(Box::new(Initialized { model, layout: None })),
        })
    }

    fn require_open(&self) -> Result<&Initialized, IsoError> {
        match &self.state {
            State::Initialized(init) => Ok(init),
            State::Closed => Err(IsoError::NotOpen),
        }
    }

    fn require_open_mut(&mut self) -> Result<&mut Initialized, IsoError> {
        match &mut self.state {
            State::Initialized(init) => Ok(init),
            State::Closed => Err(IsoError::NotOpen),
        }
    }

    pub fn add_directory(&mut self, iso_path: &str) -> Result<(), IsoError> {
        let init = self.require_open_mut()?;
        let model = &mut init.model;
        let comps = split_path(iso_path)?;
        let (parent, name) = comps.split_at(comps.len() - 1);
        let name = name[0];

        let pvd_parent = resolve_pvd_directory(&model.pvd_tree, parent, model.interchange_level)?;
        let pvd_name = mangle::mangle_directory_identifier(name, model.interchange_level)?;
        model.pvd_tree.insert_directory(pvd_parent, pvd_name)?;

        if let Some(joliet_tree) = &mut model.joliet_tree {
            let joliet_parent = resolve_joliet_directory(joliet_tree, parent)?;
            let joliet_name = ucs2::encode(name)?;
            joliet_tree.insert_directory(joliet_parent, joliet_name)?;
        }

        init.layout = None;
        Ok(())
    }

    pub fn add_file(&mut self, host_bytes: Vec<u8>, iso_path: &str) -> Result<(), IsoError> {
        let init = self.require_open_mut()?;
        let model = &mut init.model;
        let comps = split_path(iso_path)?;
        let (parent, name) = comps.split_at(comps.len() - 1);
        let name = name[0];
        let data_length = host_bytes.len() as u32;
        let content_id = model.content.push(host_bytes);

        let pvd_parent = resolve_pvd_directory(&model.pvd_tree, parent, model.interchange_level)?;
        let pvd_name = mangle::mangle_file_identifier(name, 1, model.interchange_level)?;
        model
            .pvd_tree
            .insert_file(pvd_parent, pvd_name, content_id, data_length)?;

        if let Some(joliet_tree) = &mut model.joliet_tree {
            let joliet_parent = resolve_joliet_directory(joliet_tree, parent)?;
            let joliet_name = ucs2::encode(name)?;
            joliet_tree.insert_file(joliet_parent, joliet_name, content_id, data_length)?;
        }

        init.layout = None;
        Ok(())
    }

    pub fn add_eltorito(
        &mut self,
        boot_iso_path: &str,
        bootcat_iso_path: &str,
        opts: ElToritoOptions,
    ) -> Result<(), IsoError> {
        let init = self.require_open_mut()?;
        let model = &mut init.model;

        let boot_comps = literal_path_components(boot_iso_path)?;
        let boot_idx = model.pvd_tree.resolve(&boot_comps)?;
        let boot_content = model
            .pvd_tree
            .node(boot_idx)
            .content_id()
            .ok_or_else(|| IsoError::NotAFile(boot_iso_path.to_string()))?;

        let comps = split_path(bootcat_iso_path)?;
        let (parent, name) = comps.split_at(comps.len() - 1);
        let cat_parent = resolve_pvd_directory(&model.pvd_tree, parent, model.interchange_level)?;
        let cat_name = mangle::mangle_file_identifier(name[0], 1, model.interchange_level)?;
        model.pvd_tree.insert_boot_catalog(cat_parent, cat_name)?;

        model.eltorito = Some(EltoritoConfig {
            platform_id: opts.platform_id,
            media_type: opts.boot_media_type,
            load_segment: opts.load_segment,
            boot_content,
        });

        init.layout = None;
        Ok(())
    }

    pub fn get_and_write<W: Write>(&mut self, iso_path: &str, sink: &mut W) -> Result<(), IsoError> {
        let init = self.require_open()?;
        let model = &init.model;
        let comps = literal_path_components(iso_path)?;
        let idx = model.pvd_tree.resolve(&comps)?;
        let node = model.pvd_tree.node(idx);
        if node.is_directory() {
            return Err(IsoError::NotAFile(iso_path.to_string()));
        }
        let content_id = node
            .content_id()
            .ok_or_else(|| IsoError::NotAFile(iso_path.to_string()))?;
        sink.write_all(model.content.get(content_id))?;
        Ok(())
    }

    pub fn write<W: Write>(&mut self, sink: &mut W) -> Result<(), IsoError> {
        let init = self.require_open_mut()?;
        if init.layout.is_none() {
            init.layout = Some(compute_layout(&mut init.model));
        }
        let model = &init.model;
        let layout = init.layout.as_ref().expect("layout computed above");

        let eltorito = model.eltorito.as_ref().map(|cfg| {
            let (extent, len) = layout.content_extents[cfg.boot_content];
            EltoritoWrite {
                platform_id: cfg.platform_id,
                media_type: cfg.media_type,
                load_segment: cfg.load_segment,
                boot_content_extent: extent,
                boot_content_len: len,
            }
        });

        writer::write(
            sink,
            &model.identity,
            &model.pvd_tree,
            model.joliet_tree.as_ref(),
            &model.content,
            layout,
            eltorito.as_ref(),
        )
    }

    pub fn close(&mut self) {
        self.state = State::Closed;
    }
}

fn compute_layout(model: &mut Model) -> Layout {
    let boot_catalog_blocks = model.eltorito.as_ref().map(|_| 1);
    let content_lens: Vec<u32> = model.content.iter().map(|(_, bytes)| bytes.len() as u32).collect();
    let layout = layout::compute(LayoutInput {
        pvd_tree: &model.pvd_tree,
        joliet_tree: model.joliet_tree.as_ref(),
        content_lens: &content_lens,
        boot_catalog_blocks,
    });
    let content_extents: Vec<(u32, u32)> = layout.content_extents.clone();
    layout::apply_extents(
        &mut model.pvd_tree,
        &layout.pvd_dirs,
        &content_extents,
        layout.boot_catalog(),
    );
    if let Some(joliet_tree) = &mut model.joliet_tree {
        layout::apply_extents(joliet_tree, &layout.joliet_dirs, &content_extents, layout.boot_catalog());
    }
    layout
}

fn split_path(path: &str) -> Result<Vec<&str>, IsoError> {
    let comps: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if comps.is_empty() {
        return Err(IsoError::InvalidArgument("path has no components".to_string()));
    }
    Ok(comps)
}

/// Splits `path` into identifier components without mangling, for lookups
/// against an already-built tree (spec.md §4.7: components are matched as
/// already-mangled identifiers, not re-derived from a host name).
fn literal_path_components(path: &str) -> Result<Vec<Vec<u8>>, IsoError> {
    split_path(path).map(|comps| comps.into_iter().map(|c| c.as_bytes().to_vec()).collect())
}

fn resolve_pvd_directory(tree: &Tree, comps: &[&str], level: InterchangeLevel) -> Result<usize, IsoError> {
    let mangled: Result<Vec<Vec<u8>>, IsoError> = comps
        .iter()
        .map(|name| mangle::mangle_directory_identifier(name, level))
        .collect();
    tree.resolve_directory(&mangled?)
}

fn resolve_joliet_directory(tree: &Tree, comps: &[&str]) -> Result<usize, IsoError> {
    let mangled: Result<Vec<Vec<u8>>, IsoError> = comps.iter().map(|name| ucs2::encode(name)).collect();
    tree.resolve_directory(&mangled?)
}
