#![forbid(unsafe_code)]

use crate::dmi::DmiTable;
use crate::variant::EvidenceVariant;
use crate::{NormalizeError, NormalizedEvidence, require_uuid, scalar_string};
use dh_core::device::{ComponentKind, ComponentRecord, DeviceAttributes, EvidenceCategory};
use serde_json::Value;

// DMI chassis strings grouped under the canonical chassis names. Matching
// is by exact lowercase membership.
const CHASSIS_GROUPS: &[(&str, &[&str])] = &[
    (
        "Tower",
        &["desktop", "low-profile", "tower", "server", "low profile desktop"],
    ),
    ("Docking", &["docking"]),
    ("AllInOne", &["all-in-one"]),
    ("Microtower", &["mini-tower", "space-saving", "mini"]),
    ("PizzaBox", &["pizzabox"]),
    ("Lunchbox", &["lunchbox"]),
    ("Stick", &["stick"]),
    ("Handheld", &["handheld"]),
    (
        "Laptop",
        &["portable", "laptop", "notebook", "sub-notebook", "netbook"],
    ),
    ("Convertible", &["convertible"]),
    ("Detachable", &["detachable"]),
    ("Tablet", &["tablet"]),
    ("Virtual", &["_virtual"]),
];

const STORAGE_INTERFACES: &[&str] = &["ATA", "USB", "PCI", "NVME"];

pub(crate) fn chassis_to_canonical(raw: &str) -> Option<&'static str> {
    let lower = raw.to_lowercase();
    CHASSIS_GROUPS
        .iter()
        .find(|(_, aliases)| aliases.contains(&lower.as_str()))
        .map(|(name, _)| *name)
}

/// Older workbench build: device attributes come from the DMI table,
/// components from the DMI table plus the nested hardware tree, drives from
/// a per-disk diagnostic list.
pub(crate) fn extract(payload: &Value) -> Result<NormalizedEvidence, NormalizeError> {
    let uuid = require_uuid(payload)?;
    let data = payload.get("data");
    let mut warnings = Vec::new();

    let dmidecode_raw = data
        .and_then(|data| data.get("dmidecode"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let dmi = DmiTable::parse(dmidecode_raw);
    if dmi.is_empty() {
        warnings.push("no DMI table; device attributes left empty".to_string());
    }

    let lshw = decode_tree(data.and_then(|data| data.get("lshw")), &mut warnings);

    let attributes = device_attributes(&dmi, &mut warnings);
    if mac_from_tree(&lshw).is_none() {
        warnings.push("could not retrieve a MAC address".to_string());
    }

    let mut components = Vec::new();
    processors(&dmi, &lshw, &mut components);
    memory_modules(&dmi, &mut components);
    motherboards(&dmi, &mut components);
    graphic_cards(&lshw, &mut components);
    storage_drives(data, &mut components, &mut warnings);
    sound_cards(&lshw, &mut components);
    network_adapters(&lshw, &mut components);

    Ok(NormalizedEvidence {
        uuid,
        variant: EvidenceVariant::LegacyBios,
        category: EvidenceCategory::GeneralDevice,
        attributes,
        components,
        warnings,
    })
}

fn device_attributes(dmi: &DmiTable, warnings: &mut Vec<String>) -> DeviceAttributes {
    let chassis_raw = dmi.first_value("Chassis", "Type").unwrap_or_default();
    let chassis = match chassis_to_canonical(&chassis_raw) {
        Some(canonical) => canonical.to_string(),
        None => {
            if !chassis_raw.is_empty() {
                warnings.push(format!("unmapped chassis type {chassis_raw:?}"));
            }
            String::new()
        }
    };
    DeviceAttributes {
        manufacturer: dmi.manufacturer().trim().to_string(),
        model: dmi.model().trim().to_string(),
        chassis,
        serial_number: dmi.serial_number(),
        sku: dmi.first_value("System", "SKU Number").unwrap_or_default(),
        version: dmi.first_value("System", "Version").unwrap_or_default(),
    }
}

fn decode_tree(raw: Option<&Value>, warnings: &mut Vec<String>) -> Value {
    match raw {
        Some(Value::Object(_)) => raw.cloned().unwrap_or(Value::Null),
        Some(Value::String(text)) => match serde_json::from_str(text) {
            Ok(decoded) => decoded,
            Err(err) => {
                warnings.push(format!("undecodable hardware tree: {err}"));
                Value::Null
            }
        },
        _ => Value::Null,
    }
}

fn tree_nodes<'a>(node: &'a Value, id: &str, out: &mut Vec<&'a Value>) {
    if node.get("id").and_then(Value::as_str) == Some(id) {
        out.push(node);
    }
    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            tree_nodes(child, id, out);
        }
    }
}

fn node_str(node: &Value, key: &str) -> String {
    node.get(key).map(scalar_string).unwrap_or_default()
}

/// Lowest-businfo network node's serial. Bridges stand in when no network
/// node exists (some trees hide the adapter behind the PCI bridge).
fn mac_from_tree(lshw: &Value) -> Option<String> {
    let mut nets = Vec::new();
    tree_nodes(lshw, "network", &mut nets);
    if nets.is_empty() {
        let mut bridges = Vec::new();
        tree_nodes(lshw, "bridge", &mut bridges);
        nets = bridges
            .into_iter()
            .filter(|node| node_str(node, "serial").contains(':'))
            .collect();
    }
    let mut candidates: Vec<(String, String)> = nets
        .into_iter()
        .map(|node| (node_str(node, "businfo"), node_str(node, "serial")))
        .filter(|(businfo, serial)| !businfo.is_empty() && !serial.is_empty())
        .collect();
    candidates.sort();
    candidates.into_iter().next().map(|(_, serial)| serial)
}

fn processors(dmi: &DmiTable, lshw: &Value, components: &mut Vec<ComponentRecord>) {
    for cpu in dmi.get("Processor") {
        let mut serial = cpu.get("Serial Number").cloned().unwrap_or_default();
        if serial == "Not Specified" || serial.is_empty() {
            serial = cpu
                .get("ID")
                .map(|id| id.replace(' ', ""))
                .unwrap_or_default();
        }
        let mut record = ComponentRecord::new(ComponentKind::Processor);
        record.set("speed", cpu.get("Max Speed").cloned().unwrap_or_else(|| "0".to_string()));
        record.set("cores", cpu.get("Core Count").cloned().unwrap_or_else(|| "1".to_string()));
        record.set("model", cpu.get("Version").cloned().unwrap_or_default());
        record.set(
            "threads",
            cpu.get("Thread Count").cloned().unwrap_or_else(|| "1".to_string()),
        );
        record.set("manufacturer", cpu.get("Manufacturer").cloned().unwrap_or_default());
        record.set("serialNumber", serial);
        record.set("brand", cpu.get("Family").cloned().unwrap_or_default());
        record.set("address", processor_width(lshw));
        components.push(record);
    }
}

fn processor_width(lshw: &Value) -> String {
    let mut nodes = Vec::new();
    tree_class_nodes(lshw, "processor", &mut nodes);
    for node in nodes {
        let width = node_str(node, "width");
        if !width.is_empty() {
            return width;
        }
    }
    "64".to_string()
}

fn tree_class_nodes<'a>(node: &'a Value, class: &str, out: &mut Vec<&'a Value>) {
    if node.get("class").and_then(Value::as_str) == Some(class) {
        out.push(node);
    }
    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            tree_class_nodes(child, class, out);
        }
    }
}

fn memory_modules(dmi: &DmiTable, components: &mut Vec<ComponentRecord>) {
    for ram in dmi.get("Memory Device") {
        if ram.get("Size").map(String::as_str) == Some("No Module Installed") {
            continue;
        }
        if ram.get("Speed").map_or(true, |speed| speed.is_empty()) {
            continue;
        }
        let mut record = ComponentRecord::new(ComponentKind::RamModule);
        record.set("size", ram.get("Size").cloned().unwrap_or_else(|| "0".to_string()));
        record.set("speed", ram.get("Speed").cloned().unwrap_or_else(|| "0".to_string()));
        record.set("manufacturer", ram.get("Manufacturer").cloned().unwrap_or_default());
        record.set("serialNumber", ram.get("Serial Number").cloned().unwrap_or_default());
        record.set(
            "interface",
            ram.get("Type").cloned().unwrap_or_else(|| "DDR".to_string()),
        );
        record.set(
            "format",
            ram.get("Form Factor").cloned().unwrap_or_else(|| "DIMM".to_string()),
        );
        record.set("model", ram.get("Part Number").cloned().unwrap_or_default());
        components.push(record);
    }
}

fn motherboards(dmi: &DmiTable, components: &mut Vec<ComponentRecord>) {
    for board in dmi.get("Baseboard") {
        let mut record = ComponentRecord::new(ComponentKind::Motherboard);
        record.set("version", board.get("Version").cloned().unwrap_or_default());
        record.set(
            "serialNumber",
            board.get("Serial Number").map(|s| s.trim().to_string()).unwrap_or_default(),
        );
        record.set(
            "manufacturer",
            board.get("Manufacturer").map(|s| s.trim().to_string()).unwrap_or_default(),
        );
        record.set(
            "model",
            board.get("Product Name").map(|s| s.trim().to_string()).unwrap_or_default(),
        );
        record.set(
            "biosDate",
            dmi.first_value("BIOS", "Release Date").unwrap_or_default(),
        );
        record.set("ramMaxSize", max_ram_size(dmi).to_string());
        record.set("ramSlots", dmi.get("Memory Device").len().to_string());
        record.set("slots", ram_slots(dmi).to_string());
        record.set("firewire", port_count(dmi, "FIRMWARE").to_string());
        record.set("pcmcia", port_count(dmi, "PCMCIA").to_string());
        record.set("serial", port_count(dmi, "SERIAL").to_string());
        record.set("usb", port_count(dmi, "USB").to_string());
        components.push(record);
    }
}

fn max_ram_size(dmi: &DmiTable) -> u64 {
    let mut size = 0;
    for array in dmi.get("Physical Memory Array") {
        let capacity = array
            .get("Maximum Capacity")
            .and_then(|value| value.split_whitespace().next().map(str::to_string))
            .unwrap_or_default();
        size += capacity.parse::<u64>().unwrap_or(0);
    }
    size
}

fn ram_slots(dmi: &DmiTable) -> u64 {
    dmi.get("Physical Memory Array")
        .iter()
        .filter_map(|array| array.get("Number Of Devices"))
        .filter_map(|value| value.parse::<u64>().ok())
        .sum()
}

fn port_count(dmi: &DmiTable, marker: &str) -> usize {
    dmi.get("Port Connector")
        .iter()
        .filter(|port| {
            port.get("Port Type")
                .map(|value| value.to_uppercase().contains(marker))
                .unwrap_or(false)
        })
        .count()
}

fn graphic_cards(lshw: &Value, components: &mut Vec<ComponentRecord>) {
    let mut displays = Vec::new();
    tree_nodes(lshw, "display", &mut displays);
    for node in displays {
        let driver = node
            .get("configuration")
            .and_then(|configuration| configuration.get("driver"))
            .map(scalar_string)
            .unwrap_or_default();
        if driver.is_empty() {
            continue;
        }
        let mut record = ComponentRecord::new(ComponentKind::GraphicCard);
        record.set("manufacturer", node_str(node, "vendor"));
        record.set("model", node_str(node, "product"));
        record.set("serialNumber", node_str(node, "serial"));
        components.push(record);
    }
}

fn storage_drives(
    data: Option<&Value>,
    components: &mut Vec<ComponentRecord>,
    warnings: &mut Vec<String>,
) {
    let Some(disks) = data
        .and_then(|data| data.get("disks"))
        .and_then(Value::as_array)
    else {
        return;
    };
    for disk in disks {
        let exit_status = disk
            .get("smartctl")
            .and_then(|smartctl| smartctl.get("exit_status"))
            .and_then(Value::as_i64);
        if exit_status == Some(1) {
            continue;
        }

        let mut model = disk
            .get("model_name")
            .map(scalar_string)
            .unwrap_or_default();
        let mut manufacturer = String::new();
        let words: Vec<&str> = model.split(' ').filter(|word| !word.is_empty()).collect();
        if words.len() > 1 {
            manufacturer = words[..words.len() - 1].join(" ");
            model = words[words.len() - 1].to_string();
        }

        let mut record = ComponentRecord::new(ComponentKind::Storage);
        record.set("type", storage_type(disk));
        record.set("model", model);
        record.set("manufacturer", manufacturer);
        record.set(
            "serialNumber",
            disk.get("serial_number").map(scalar_string).unwrap_or_default(),
        );
        record.set(
            "size",
            disk.get("user_capacity")
                .and_then(|capacity| capacity.get("bytes"))
                .map(scalar_string)
                .unwrap_or_default(),
        );
        record.set(
            "variant",
            disk.get("firmware_version").map(scalar_string).unwrap_or_default(),
        );
        record.set("interface", storage_interface(disk, warnings));
        record.set(
            "hours",
            disk.get("power_on_time")
                .and_then(|time| time.get("hours"))
                .map(scalar_string)
                .unwrap_or_else(|| "0".to_string()),
        );
        components.push(record);
    }
}

fn storage_type(disk: &Value) -> &'static str {
    let device_type = disk
        .get("device")
        .and_then(|device| device.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let trim_supported = disk
        .get("trim")
        .and_then(|trim| trim.get("supported"))
        .map(|value| value == &Value::Bool(true) || value.as_str() == Some("true"))
        .unwrap_or(false);
    if device_type == "nvme" || trim_supported {
        "SolidStateDrive"
    } else {
        "HardDrive"
    }
}

fn storage_interface(disk: &Value, warnings: &mut Vec<String>) -> String {
    let protocol = disk
        .get("device")
        .and_then(|device| device.get("protocol"))
        .and_then(Value::as_str)
        .unwrap_or("ATA");
    let upper = protocol.to_uppercase();
    if STORAGE_INTERFACES.contains(&upper.as_str()) {
        return upper;
    }
    warnings.push(format!("unknown storage interface {protocol:?}"));
    String::new()
}

fn sound_cards(lshw: &Value, components: &mut Vec<ComponentRecord>) {
    let mut nodes = Vec::new();
    tree_nodes(lshw, "multimedia", &mut nodes);
    for node in nodes {
        let mut record = ComponentRecord::new(ComponentKind::SoundCard);
        record.set("model", node_str(node, "product"));
        record.set("manufacturer", node_str(node, "vendor"));
        record.set("serialNumber", node_str(node, "serial"));
        components.push(record);
    }
}

fn network_adapters(lshw: &Value, components: &mut Vec<ComponentRecord>) {
    let mut nodes = Vec::new();
    tree_nodes(lshw, "network", &mut nodes);
    for node in nodes {
        let wireless = node
            .get("configuration")
            .and_then(|configuration| configuration.get("wireless"))
            .is_some();
        let mut record = ComponentRecord::new(ComponentKind::NetworkAdapter);
        record.set("model", node_str(node, "product"));
        record.set("manufacturer", node_str(node, "vendor"));
        record.set("serialNumber", node_str(node, "serial"));
        record.set("speed", node_str(node, "capacity"));
        let variant = node_str(node, "version");
        record.set("variant", if variant.is_empty() { "1".to_string() } else { variant });
        record.set("wireless", wireless.to_string());
        let integrated = node_str(node, "businfo").contains("PCI:0000:00");
        record.set("integrated", integrated.to_string());
        components.push(record);
    }
}
