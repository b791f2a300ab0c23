//! INDI driver catalog: descriptor XML parsing and device label lookup
//!
//! Descriptor files list device groups and, for every device, the driver
//! executable that serves it:
//!
//! ```xml
//! <driversList>
//!     <devGroup group="CCDs">
//!         <device label="CCD Simulator">
//!             <driver name="CCD Simulator">indi_simulator_ccd</driver>
//!             <version>1.0</version>
//!         </device>
//!     </devGroup>
//! </driversList>
//! ```
//!
//! Loading is best effort. A file that cannot be read or parsed contributes
//! nothing and is reported as a diagnostic; the remaining files still load.
//! Files are decoded according to their XML declaration, so older Latin-1
//! descriptors load as well as UTF-8 ones.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fs::DirEntry;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the catch-all descriptor shipped with the INDI library
pub const DRIVERS_FILE: &str = "drivers.xml";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Cannot read drivers directory: {0}")]
    DirectoryUnreadable(#[source] std::io::Error),
    #[error("Cannot read file: {0}")]
    Unreadable(#[from] std::io::Error),
    #[error("Parse error at byte {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("Not a drivers file (root element is <{root}>)")]
    NotDriversFile { root: String },
    #[error("<{element}> at byte {position} has no '{attribute}' attribute, skipped")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
        position: u64,
    },
}

/// A device and the command that launches its driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Display name, e.g. "CCD Simulator"
    pub label: String,
    /// Driver executable, empty when the descriptor has no `<driver>` element
    pub command: String,
}

impl DeviceEntry {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
        }
    }

    /// A device without a driver command cannot be launched
    pub fn is_resolved(&self) -> bool {
        !self.command.is_empty()
    }
}

/// Named group of devices, in descriptor order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroup {
    pub name: String,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// Problem found while loading one descriptor file
#[derive(Debug)]
pub struct CatalogDiagnostic {
    pub path: PathBuf,
    pub error: CatalogError,
}

impl std::fmt::Display for CatalogDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// Result of loading a drivers directory
#[derive(Debug, Default)]
pub struct CatalogLoad {
    pub catalog: DriverCatalog,
    pub diagnostics: Vec<CatalogDiagnostic>,
}

/// All device groups read from the descriptor files, in load order.
///
/// Groups are never merged: two files declaring the same group name yield two
/// groups. Lookups resolve to the first matching device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverCatalog {
    groups: Vec<DeviceGroup>,
}

impl DriverCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already parsed groups
    pub fn from_groups(groups: Vec<DeviceGroup>) -> Self {
        Self { groups }
    }

    /// Load every descriptor file in `dir`.
    ///
    /// Candidate files are `indi_*.xml` and `drivers.xml`, excluding skeleton
    /// files (`*_sk.xml`) and symlinks. Files are read in file name order.
    pub fn load(dir: &Path) -> CatalogLoad {
        let mut load = CatalogLoad::default();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot read drivers directory");
                load.diagnostics.push(CatalogDiagnostic {
                    path: dir.to_path_buf(),
                    error: CatalogError::DirectoryUnreadable(e),
                });
                return load;
            }
        };

        let files = descriptor_files(dir, entries, &mut load.diagnostics);

        for path in files {
            match Self::load_file(&path) {
                Ok((groups, issues)) => {
                    debug!(path = %path.display(), groups = groups.len(), "Loaded drivers file");
                    for error in issues {
                        warn!(path = %path.display(), %error, "Skipped element in drivers file");
                        load.diagnostics.push(CatalogDiagnostic {
                            path: path.clone(),
                            error,
                        });
                    }
                    load.catalog.extend(groups);
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "Failed to load drivers file");
                    load.diagnostics.push(CatalogDiagnostic { path, error });
                }
            }
        }

        info!(
            dir = %dir.display(),
            groups = load.catalog.groups.len(),
            devices = load.catalog.device_count(),
            "Driver catalog loaded"
        );
        load
    }

    /// Read and parse a single descriptor file.
    ///
    /// Only I/O failures are `Unreadable`; content that does not decode in the
    /// declared encoding is `Malformed`.
    pub fn load_file(path: &Path) -> Result<(Vec<DeviceGroup>, Vec<CatalogError>), CatalogError> {
        let content = std::fs::read(path)?;
        parse_drivers_bytes(&content)
    }

    /// Append groups after the existing ones
    pub fn extend(&mut self, groups: impl IntoIterator<Item = DeviceGroup>) {
        self.groups.extend(groups);
    }

    pub fn groups(&self) -> &[DeviceGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of devices across all groups
    pub fn device_count(&self) -> usize {
        self.groups.iter().map(|g| g.devices.len()).sum()
    }

    /// All device labels in catalog order, duplicates included
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|g| g.devices.iter().map(|d| d.label.as_str()))
    }

    /// First device with the given label, scanning groups then devices
    pub fn find_device(&self, label: &str) -> Option<&DeviceEntry> {
        self.groups
            .iter()
            .flat_map(|g| g.devices.iter())
            .find(|d| d.label == label)
    }

    /// Driver command for a label.
    ///
    /// Only the first device carrying the label is considered; if it has no
    /// command the label is unresolved even when a later duplicate has one.
    pub fn find_command(&self, label: &str) -> Option<&str> {
        self.find_device(label)
            .filter(|d| d.is_resolved())
            .map(|d| d.command.as_str())
    }
}

/// Whether a file name is a device descriptor
pub fn is_descriptor_name(name: &str) -> bool {
    if name.ends_with("_sk.xml") {
        return false;
    }
    name == DRIVERS_FILE || (name.starts_with("indi_") && name.ends_with(".xml"))
}

/// Descriptor files among the entries of `dir`, sorted by file name.
///
/// An entry that cannot be inspected is recorded and skipped.
fn descriptor_files<I>(
    dir: &Path,
    entries: I,
    diagnostics: &mut Vec<CatalogDiagnostic>,
) -> Vec<PathBuf>
where
    I: IntoIterator<Item = std::io::Result<DirEntry>>,
{
    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory entry");
                diagnostics.push(CatalogDiagnostic {
                    path: dir.to_path_buf(),
                    error: CatalogError::Unreadable(e),
                });
                continue;
            }
        };
        // file_type() does not follow symlinks
        match entry.file_type() {
            Ok(file_type) if file_type.is_file() => {}
            Ok(_) => continue,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Skipping unreadable directory entry");
                diagnostics.push(CatalogDiagnostic {
                    path: entry.path(),
                    error: CatalogError::Unreadable(e),
                });
                continue;
            }
        }
        let name = entry.file_name();
        match name.to_str() {
            Some(name) if is_descriptor_name(name) => files.push(entry.path()),
            _ => {}
        }
    }
    files.sort();
    files
}

/// Parse descriptor XML into device groups.
///
/// Returns the groups plus the element-level problems that were skipped over.
/// A document that is not well formed or whose root is not `<driversList>`
/// yields an error and no groups.
pub fn parse_drivers_xml(xml: &str) -> Result<(Vec<DeviceGroup>, Vec<CatalogError>), CatalogError> {
    DriversReader::new(Reader::from_str(xml)).read()
}

/// Parse raw descriptor bytes, decoding them by BOM or XML declaration
/// (UTF-8 when neither is present)
pub fn parse_drivers_bytes(
    xml: &[u8],
) -> Result<(Vec<DeviceGroup>, Vec<CatalogError>), CatalogError> {
    DriversReader::new(Reader::from_reader(xml)).read()
}

struct DriversReader<'a> {
    reader: Reader<&'a [u8]>,
    issues: Vec<CatalogError>,
}

impl<'a> DriversReader<'a> {
    fn new(mut reader: Reader<&'a [u8]>) -> Self {
        reader.config_mut().trim_text(true);
        Self {
            reader,
            issues: Vec::new(),
        }
    }

    fn read(mut self) -> Result<(Vec<DeviceGroup>, Vec<CatalogError>), CatalogError> {
        loop {
            match self.next()? {
                Event::Start(e) => {
                    self.check_root(&e)?;
                    let groups = self.read_drivers_list()?;
                    return Ok((groups, self.issues));
                }
                Event::Empty(e) => {
                    self.check_root(&e)?;
                    return Ok((Vec::new(), self.issues));
                }
                Event::Eof => return Err(self.malformed("document has no root element")),
                _ => {}
            }
        }
    }

    fn read_drivers_list(&mut self) -> Result<Vec<DeviceGroup>, CatalogError> {
        let mut groups = Vec::new();
        loop {
            match self.next()? {
                Event::Start(e) if e.local_name().as_ref() == b"devGroup" => {
                    if let Some(group) = self.read_group(&e)? {
                        groups.push(group);
                    }
                }
                Event::Start(e) => self.skip(&e)?,
                Event::Empty(e) if e.local_name().as_ref() == b"devGroup" => {
                    match self.attribute(&e, "group")? {
                        Some(name) => groups.push(DeviceGroup {
                            name,
                            devices: Vec::new(),
                        }),
                        None => self.missing("devGroup", "group"),
                    }
                }
                Event::End(_) => return Ok(groups),
                Event::Eof => return Err(self.malformed("unexpected end of document")),
                _ => {}
            }
        }
    }

    fn read_group(&mut self, start: &BytesStart<'a>) -> Result<Option<DeviceGroup>, CatalogError> {
        let Some(name) = self.attribute(start, "group")? else {
            self.missing("devGroup", "group");
            self.skip(start)?;
            return Ok(None);
        };

        let mut devices = Vec::new();
        loop {
            match self.next()? {
                Event::Start(e) if e.local_name().as_ref() == b"device" => {
                    if let Some(device) = self.read_device(&e)? {
                        devices.push(device);
                    }
                }
                Event::Start(e) => self.skip(&e)?,
                Event::Empty(e) if e.local_name().as_ref() == b"device" => {
                    match self.label(&e)? {
                        Some(label) => devices.push(DeviceEntry::new(label, "")),
                        None => self.missing("device", "label"),
                    }
                }
                Event::End(_) => break,
                Event::Eof => return Err(self.malformed("unexpected end of document")),
                _ => {}
            }
        }

        Ok(Some(DeviceGroup { name, devices }))
    }

    fn read_device(&mut self, start: &BytesStart<'a>) -> Result<Option<DeviceEntry>, CatalogError> {
        let position = self.position();
        let label = self.label(start)?;

        // Every <driver> overwrites the previous one
        let mut command = String::new();
        loop {
            match self.next()? {
                Event::Start(e) if e.local_name().as_ref() == b"driver" => {
                    command = self.read_text()?;
                }
                Event::Start(e) => self.skip(&e)?,
                Event::Empty(e) if e.local_name().as_ref() == b"driver" => command.clear(),
                Event::End(_) => break,
                Event::Eof => return Err(self.malformed("unexpected end of document")),
                _ => {}
            }
        }

        match label {
            Some(label) => Ok(Some(DeviceEntry { label, command })),
            None => {
                self.issues.push(CatalogError::MissingAttribute {
                    element: "device",
                    attribute: "label",
                    position,
                });
                Ok(None)
            }
        }
    }

    /// Text content of the current element; nested elements are ignored
    fn read_text(&mut self) -> Result<String, CatalogError> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Event::Text(t) => {
                    let unescaped = t.unescape().map_err(|e| self.malformed(e.to_string()))?;
                    text.push_str(&unescaped);
                }
                Event::CData(c) => {
                    let decoded = self
                        .reader
                        .decoder()
                        .decode(&c)
                        .map_err(|e| self.malformed(e.to_string()))?;
                    text.push_str(&decoded);
                }
                Event::Start(e) => self.skip(&e)?,
                Event::End(_) => break,
                Event::Eof => return Err(self.malformed("unexpected end of document")),
                _ => {}
            }
        }
        Ok(text.trim().to_string())
    }

    /// Non-empty `label` attribute of a device
    fn label(&self, start: &BytesStart<'_>) -> Result<Option<String>, CatalogError> {
        Ok(self.attribute(start, "label")?.filter(|l| !l.is_empty()))
    }

    fn attribute(&self, start: &BytesStart<'_>, name: &str) -> Result<Option<String>, CatalogError> {
        match start.try_get_attribute(name) {
            Ok(Some(attr)) => attr
                .decode_and_unescape_value(self.reader.decoder())
                .map(|v| Some(v.into_owned()))
                .map_err(|e| self.malformed(e.to_string())),
            Ok(None) => Ok(None),
            Err(e) => Err(self.malformed(e.to_string())),
        }
    }

    fn skip(&mut self, start: &BytesStart<'_>) -> Result<(), CatalogError> {
        self.reader
            .read_to_end(start.name())
            .map(|_| ())
            .map_err(|e| self.malformed(e.to_string()))
    }

    fn next(&mut self) -> Result<Event<'a>, CatalogError> {
        self.reader
            .read_event()
            .map_err(|e| self.malformed(e.to_string()))
    }

    fn missing(&mut self, element: &'static str, attribute: &'static str) {
        let position = self.position();
        self.issues.push(CatalogError::MissingAttribute {
            element,
            attribute,
            position,
        });
    }

    fn malformed(&self, message: impl Into<String>) -> CatalogError {
        CatalogError::Malformed {
            position: self.position(),
            message: message.into(),
        }
    }

    fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn check_root(&self, start: &BytesStart<'_>) -> Result<(), CatalogError> {
        if start.local_name().as_ref() == b"driversList" {
            return Ok(());
        }
        let name = start.name();
        let root = self
            .reader
            .decoder()
            .decode(name.as_ref())
            .map_err(|e| self.malformed(e.to_string()))?;
        Err(CatalogError::NotDriversFile {
            root: root.into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SIMULATORS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<driversList>
    <devGroup group="G1">
        <device label="A">
            <driver name="A">cmdA</driver>
            <version>1.0</version>
        </device>
        <device label="B">
            <driver name="B">cmdB</driver>
        </device>
    </devGroup>
    <devGroup group="G2">
        <device label="C" manufacturer="Acme">
            <driver name="C">cmdC</driver>
        </device>
    </devGroup>
</driversList>"#;

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    fn group_xml(group: &str, label: &str, command: &str) -> String {
        format!(
            r#"<driversList><devGroup group="{group}"><device label="{label}"><driver>{command}</driver></device></devGroup></driversList>"#
        )
    }

    #[test]
    fn test_parse_groups_in_order() {
        let (groups, issues) = parse_drivers_xml(SIMULATORS).unwrap();
        assert!(issues.is_empty());
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].name, "G1");
        assert_eq!(
            groups[0].devices,
            vec![DeviceEntry::new("A", "cmdA"), DeviceEntry::new("B", "cmdB")]
        );
        assert_eq!(groups[1].name, "G2");
        assert_eq!(groups[1].devices, vec![DeviceEntry::new("C", "cmdC")]);
    }

    #[test]
    fn test_last_driver_wins() {
        let xml = r#"<driversList>
            <devGroup group="CCDs">
                <device label="Dual">
                    <driver>x</driver>
                    <port>usb</port>
                    <driver>y</driver>
                </device>
            </devGroup>
        </driversList>"#;

        let (groups, _) = parse_drivers_xml(xml).unwrap();
        assert_eq!(groups[0].devices[0].command, "y");
    }

    #[test]
    fn test_device_without_driver_is_unresolved() {
        let xml = r#"<driversList>
            <devGroup group="Auxiliary">
                <device label="Manual Filter"><version>0.1</version></device>
                <device label="Dome Simulator"/>
            </devGroup>
        </driversList>"#;

        let (groups, issues) = parse_drivers_xml(xml).unwrap();
        assert!(issues.is_empty());
        assert_eq!(groups[0].devices.len(), 2);
        assert!(groups[0].devices.iter().all(|d| !d.is_resolved()));
    }

    #[test]
    fn test_group_without_name_is_skipped() {
        let xml = r#"<driversList>
            <devGroup>
                <device label="Orphan"><driver>indi_orphan</driver></device>
            </devGroup>
            <devGroup group="Telescopes">
                <device label="Telescope Simulator"><driver>indi_simulator_telescope</driver></device>
            </devGroup>
        </driversList>"#;

        let (groups, issues) = parse_drivers_xml(xml).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Telescopes");
        assert_eq!(groups[0].devices.len(), 1);

        assert_eq!(issues.len(), 1);
        assert!(matches!(
            issues[0],
            CatalogError::MissingAttribute { element: "devGroup", attribute: "group", .. }
        ));
    }

    #[test]
    fn test_device_without_label_is_skipped() {
        let xml = r#"<driversList>
            <devGroup group="Focusers">
                <device><driver>indi_nolabel</driver></device>
                <device label=""><driver>indi_emptylabel</driver></device>
                <device label="Focuser Simulator"><driver>indi_simulator_focus</driver></device>
            </devGroup>
        </driversList>"#;

        let (groups, issues) = parse_drivers_xml(xml).unwrap();
        assert_eq!(groups[0].devices, vec![DeviceEntry::new("Focuser Simulator", "indi_simulator_focus")]);
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_unknown_elements_are_ignored() {
        let xml = r#"<driversList>
            <comment><devGroup group="Hidden"/></comment>
            <devGroup group="CCDs">
                <metadata><device label="Nested"><driver>nope</driver></device></metadata>
                <device label="CCD Simulator">
                    <driver name="CCD Simulator">indi_simulator_ccd</driver>
                </device>
            </devGroup>
        </driversList>"#;

        let (groups, issues) = parse_drivers_xml(xml).unwrap();
        assert!(issues.is_empty());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].devices, vec![DeviceEntry::new("CCD Simulator", "indi_simulator_ccd")]);
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let xml = r#"<?xml version="1.0"?><INDIHosts><host name="local"/></INDIHosts>"#;
        match parse_drivers_xml(xml) {
            Err(CatalogError::NotDriversFile { root }) => assert_eq!(root, "INDIHosts"),
            other => panic!("expected NotDriversFile, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        let xml = r#"<driversList><devGroup group="G"><device label="A"></devGroup></driversList>"#;
        assert!(matches!(
            parse_drivers_xml(xml),
            Err(CatalogError::Malformed { .. })
        ));

        assert!(matches!(parse_drivers_xml(""), Err(CatalogError::Malformed { .. })));
    }

    #[test]
    fn test_empty_drivers_list() {
        let (groups, issues) = parse_drivers_xml("<driversList/>").unwrap();
        assert!(groups.is_empty());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_descriptor_names() {
        assert!(is_descriptor_name("drivers.xml"));
        assert!(is_descriptor_name("indi_eqmod.xml"));
        assert!(!is_descriptor_name("indi_eqmod_sk.xml"));
        assert!(!is_descriptor_name("drivers_sk.xml"));
        assert!(!is_descriptor_name("indihosts.xml"));
        assert!(!is_descriptor_name("indi_eqmod.xml.bak"));
    }

    #[test]
    fn test_load_skips_skeleton_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "indi_foo.xml", &group_xml("Foo", "Foo Device", "indi_foo"));
        write(&dir, "indi_foo_sk.xml", &group_xml("Skeleton", "Foo Device", "indi_foo_sk"));
        write(&dir, "notes.xml", &group_xml("Notes", "Other", "indi_other"));

        let load = DriverCatalog::load(dir.path());
        assert!(load.diagnostics.is_empty());
        let names: Vec<_> = load.catalog.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Foo"]);
    }

    #[test]
    fn test_load_continues_past_bad_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "drivers.xml", &group_xml("Telescopes", "Telescope Simulator", "indi_simulator_telescope"));
        write(&dir, "indi_broken.xml", "<driversList><devGroup group=\"X\">");
        write(&dir, "indi_hosts.xml", "<INDIHosts/>");
        write(&dir, "indi_zwo.xml", &group_xml("CCDs", "ZWO CCD", "indi_asi_ccd"));

        let load = DriverCatalog::load(dir.path());
        assert_eq!(load.diagnostics.len(), 2);
        assert_eq!(load.catalog.groups().len(), 2);
        assert_eq!(load.catalog.find_command("ZWO CCD"), Some("indi_asi_ccd"));

        let failed: Vec<_> = load
            .diagnostics
            .iter()
            .filter_map(|d| d.path.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(failed, vec!["indi_broken.xml", "indi_hosts.xml"]);
    }

    #[test]
    fn test_load_keeps_duplicate_groups_in_name_order() {
        let dir = TempDir::new().unwrap();
        write(&dir, "indi_b.xml", &group_xml("CCDs", "Shared", "from_b"));
        write(&dir, "indi_a.xml", &group_xml("CCDs", "Shared", "from_a"));

        let load = DriverCatalog::load(dir.path());
        assert_eq!(load.catalog.groups().len(), 2);
        assert_eq!(load.catalog.find_command("Shared"), Some("from_a"));
        assert_eq!(load.catalog.labels().count(), 2);
    }

    #[test]
    fn test_latin1_descriptor_is_decoded() {
        let dir = TempDir::new().unwrap();
        let mut xml = br#"<?xml version="1.0" encoding="ISO-8859-1"?>
<driversList><devGroup group="CCDs"><device label="Cam"#
            .to_vec();
        xml.push(0xE9);
        xml.extend_from_slice(br#"ra"><driver>indi_camera_ccd</driver></device></devGroup></driversList>"#);
        std::fs::write(dir.path().join("indi_latin.xml"), &xml).unwrap();

        let load = DriverCatalog::load(dir.path());
        assert!(load.diagnostics.is_empty());
        assert_eq!(load.catalog.find_command("Cam\u{e9}ra"), Some("indi_camera_ccd"));
    }

    #[test]
    fn test_undecodable_descriptor_is_malformed() {
        let mut xml = br#"<driversList><devGroup group="CCDs"><device label="Cam"#.to_vec();
        xml.push(0xE9);
        xml.extend_from_slice(br#"ra"><driver>indi_camera_ccd</driver></device></devGroup></driversList>"#);

        assert!(matches!(
            parse_drivers_bytes(&xml),
            Err(CatalogError::Malformed { .. })
        ));
    }

    #[test]
    fn test_bad_directory_entry_does_not_block_others() {
        let dir = TempDir::new().unwrap();
        write(&dir, "indi_foo.xml", &group_xml("Foo", "Foo Device", "indi_foo"));

        let entries = std::iter::once(Err(std::io::Error::other("stale entry")))
            .chain(std::fs::read_dir(dir.path()).unwrap());
        let mut diagnostics = Vec::new();
        let files = descriptor_files(dir.path(), entries, &mut diagnostics);

        assert_eq!(files, vec![dir.path().join("indi_foo.xml")]);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0].error, CatalogError::Unreadable(_)));
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = TempDir::new().unwrap();
        let load = DriverCatalog::load(&dir.path().join("missing"));
        assert!(load.catalog.is_empty());
        assert!(matches!(
            load.diagnostics[0].error,
            CatalogError::DirectoryUnreadable(_)
        ));
    }

    #[test]
    fn test_find_command_first_match() {
        let catalog = DriverCatalog::from_groups(vec![
            DeviceGroup {
                name: "Vendor A".to_string(),
                devices: vec![DeviceEntry::new("EQMod Mount", "indi_eqmod_telescope")],
            },
            DeviceGroup {
                name: "Vendor B".to_string(),
                devices: vec![
                    DeviceEntry::new("EQMod Mount", "indi_other_telescope"),
                    DeviceEntry::new("Unlaunchable", ""),
                ],
            },
        ]);

        assert_eq!(catalog.find_command("EQMod Mount"), Some("indi_eqmod_telescope"));
        assert_eq!(catalog.find_command("Unlaunchable"), None);
        assert_eq!(catalog.find_command("Nope"), None);
        assert_eq!(catalog.device_count(), 3);
    }
}
