#![forbid(unsafe_code)]

use crate::dmi::DmiTable;
use crate::variant::EvidenceVariant;
use crate::{NormalizeError, NormalizedEvidence, inxi, require_uuid};
use dh_core::device::{ComponentKind, ComponentRecord, DeviceAttributes, EvidenceCategory};
use serde_json::Value;

/// Default path: a live-enumeration dataset (`data.inxi`) plus an optional
/// DMI dump (`data.dmidecode`). At least one of the two must be present.
pub(crate) fn extract(payload: &Value) -> Result<NormalizedEvidence, NormalizeError> {
    let uuid = require_uuid(payload)?;
    let data = payload.get("data");

    let dmidecode_raw = data
        .and_then(|data| data.get("dmidecode"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let inxi_raw = data.and_then(|data| data.get("inxi"));

    let mut warnings = Vec::new();
    let inxi = match inxi_raw {
        Some(raw) => match inxi::decode(raw) {
            Ok(decoded) => decoded,
            Err(problem) => {
                warnings.push(problem);
                Value::Null
            }
        },
        None => Value::Null,
    };

    if dmidecode_raw.trim().is_empty() && inxi.is_null() && warnings.is_empty() {
        return Err(NormalizeError::MissingRequiredData(
            "dmidecode or inxi dataset",
        ));
    }

    let dmi = DmiTable::parse(dmidecode_raw);
    let attributes = device_attributes(&inxi, &mut warnings);

    let mut components = Vec::new();
    if let Some(motherboard) = motherboard(&inxi, &dmi) {
        components.push(motherboard);
    }
    if let Some(processor) = processor(&inxi) {
        components.push(processor);
    }
    if let Some(memory) = memory_module(&inxi) {
        components.push(memory);
    }
    graphic_cards(&inxi, &mut components);
    displays(&inxi, &mut components);
    network_adapters(&inxi, &mut components, &mut warnings);
    sound_cards(&inxi, &mut components);
    storage_drives(&inxi, &mut components);
    batteries(&inxi, &mut components);

    Ok(NormalizedEvidence {
        uuid,
        variant: EvidenceVariant::Modern,
        category: EvidenceCategory::GeneralDevice,
        attributes,
        components,
        warnings,
    })
}

fn device_attributes(inxi: &Value, warnings: &mut Vec<String>) -> DeviceAttributes {
    let mut attrs = DeviceAttributes::default();
    let Some(machine) = inxi::section(inxi, "Machine") else {
        warnings.push("no Machine section; device attributes left empty".to_string());
        return attrs;
    };
    for row in machine {
        let system = inxi::field_str(row, "System");
        if !system.is_empty() {
            attrs.manufacturer = system;
            attrs.model = inxi::field_str(row, "product");
            attrs.serial_number = inxi::field_str(row, "serial");
            attrs.chassis = inxi::field_str(row, "Type");
            attrs.version = inxi::field_str(row, "v");
        } else {
            // Rows without a System field carry the SKU. Later rows (Mobo,
            // BIOS) also land here; only a row that actually has the field
            // may set it, or the order of rows would decide the value.
            let sku = inxi::field_str(row, "part-nu");
            if !sku.is_empty() {
                attrs.sku = sku;
            }
        }
    }
    attrs
}

fn motherboard(inxi: &Value, dmi: &DmiTable) -> Option<ComponentRecord> {
    let machine = inxi::section(inxi, "Machine")?;
    let mut record = ComponentRecord::new(ComponentKind::Motherboard);
    let mut found = false;
    for row in machine {
        let bios_date = inxi::field_str(row, "date");
        if bios_date.is_empty() {
            continue;
        }
        found = true;
        record.set("manufacturer", inxi::field_str(row, "Mobo"));
        record.set("model", inxi::field_str(row, "model"));
        record.set("serialNumber", inxi::field_str(row, "serial"));
        record.set("version", inxi::field_str(row, "v"));
        record.set("biosDate", bios_date);
        record.set(
            "biosVersion",
            dmi.first_value("BIOS", "BIOS Revision")
                .unwrap_or_else(|| "1".to_string()),
        );
    }
    if !found {
        return None;
    }
    if let Some(memory) = inxi::section(inxi, "Memory") {
        for row in memory {
            let slots = inxi::field_str(row, "slots");
            if slots.is_empty() {
                continue;
            }
            record.set("slots", slots);
            record.set("ramSlots", inxi::field_str(row, "modules"));
            record.set("ramMaxSize", inxi::field_str(row, "capacity"));
        }
    }
    Some(record)
}

// CPU data is spread over three row shapes: the model row, the cache and
// topology row, and the clocks row.
fn processor(inxi: &Value) -> Option<ComponentRecord> {
    let cpu = inxi::section(inxi, "CPU")?;
    let mut record = ComponentRecord::new(ComponentKind::Processor);
    let mut found = false;
    for row in cpu {
        let model = inxi::field_str(row, "model");
        if !model.is_empty() {
            found = true;
            record.set("model", model);
            record.set("arch", inxi::field_str(row, "arch"));
            record.set("bits", inxi::field_str(row, "bits"));
            record.set("gen", inxi::field_str(row, "gen"));
            record.set("family", inxi::field_str(row, "family"));
            record.set("date", inxi::field_str(row, "built"));
            continue;
        }
        let l1 = inxi::field_str(row, "L1");
        if !l1.is_empty() {
            found = true;
            record.set("L1", l1);
            record.set("L2", inxi::field_str(row, "L2"));
            record.set("L3", inxi::field_str(row, "L3"));
            record.set("cpus", inxi::field_str(row, "cpus"));
            record.set("cores", inxi::field_str(row, "cores"));
            record.set("threads", inxi::field_str(row, "threads"));
            continue;
        }
        let bogomips = inxi::field_str(row, "bogomips");
        if !bogomips.is_empty() {
            found = true;
            record.set("bogomips", bogomips);
            record.set("base/boost", inxi::field_str(row, "base/boost"));
            record.set("min/max", inxi::field_str(row, "min/max"));
            record.set("ext-clock", inxi::field_str(row, "ext-clock"));
            record.set("volts", inxi::field_str(row, "volts"));
        }
    }
    found.then_some(record)
}

fn memory_module(inxi: &Value) -> Option<ComponentRecord> {
    let memory = inxi::section(inxi, "Memory")?;
    let mut record = ComponentRecord::new(ComponentKind::RamModule);
    let mut found = false;
    for row in memory {
        if !inxi::field_str(row, "System RAM").is_empty() {
            found = true;
            record.set("size", inxi::field_str(row, "total"));
        }
        let manufacturer = inxi::field_str(row, "manufacturer");
        if !manufacturer.is_empty() {
            found = true;
            record.set("manufacturer", manufacturer);
            record.set("model", inxi::field_str(row, "part-no"));
            record.set("serialNumber", inxi::field_str(row, "serial"));
            record.set("speed", inxi::field_str(row, "speed"));
            record.set("bits", inxi::field_str(row, "data"));
            record.set("interface", inxi::field_str(row, "type"));
        }
        let modules = inxi::field_str(row, "modules");
        if !modules.is_empty() {
            found = true;
            record.set("modules", modules);
        }
    }
    found.then_some(record)
}

fn graphic_cards(inxi: &Value, components: &mut Vec<ComponentRecord>) {
    let Some(graphics) = inxi::section(inxi, "Graphics") else {
        return;
    };
    for row in graphics {
        let device = inxi::field_str(row, "Device");
        let vendor = inxi::field_str(row, "vendor");
        if device.is_empty() || vendor.is_empty() {
            continue;
        }
        let mut record = ComponentRecord::new(ComponentKind::GraphicCard);
        record.set("memory", video_memory(inxi));
        record.set("manufacturer", vendor);
        record.set("model", device);
        record.set("arch", inxi::field_str(row, "arch"));
        record.set("serialNumber", inxi::field_str(row, "serial"));
        let integrated = !inxi::field_str(row, "port").is_empty();
        record.set("integrated", integrated.to_string());
        components.push(record);
    }
}

fn video_memory(inxi: &Value) -> String {
    let Some(memory) = inxi::section(inxi, "Memory") else {
        return String::new();
    };
    for row in memory {
        for marker in ["igpu", "agpu", "gpu", "ngpu"] {
            let value = inxi::field_str(row, marker);
            if !value.is_empty() {
                return value;
            }
        }
    }
    String::new()
}

fn displays(inxi: &Value, components: &mut Vec<ComponentRecord>) {
    let Some(graphics) = inxi::section(inxi, "Graphics") else {
        return;
    };
    for row in graphics {
        if inxi::field_str(row, "Monitor").is_empty() {
            continue;
        }
        let mut record = ComponentRecord::new(ComponentKind::Display);
        record.set("model", inxi::field_str(row, "model"));
        record.set("manufacturer", inxi::field_str(row, "vendor"));
        record.set("serialNumber", inxi::field_str(row, "serial"));
        record.set("size", inxi::field_str(row, "size"));
        record.set("diagonal", inxi::field_str(row, "diag"));
        record.set("resolution", inxi::field_str(row, "res"));
        record.set("date", inxi::field_str(row, "built"));
        record.set("ratio", inxi::field_str(row, "ratio"));
        components.push(record);
    }
}

// Adapters arrive as consecutive row pairs: the device row, then the
// interface row carrying mac and link speed.
fn network_adapters(
    inxi: &Value,
    components: &mut Vec<ComponentRecord>,
    warnings: &mut Vec<String>,
) {
    let mut mac_seen = false;
    let empty = Vec::new();
    let networks = inxi::section(inxi, "Network").unwrap_or(&empty);
    for (index, row) in networks.iter().enumerate() {
        if index + 1 >= networks.len() {
            break;
        }
        let model = inxi::field_str(row, "Device");
        if model.is_empty() {
            continue;
        }

        let mut interface = String::new();
        if let Some(map) = row.as_object() {
            for key in map.keys() {
                if key.contains("port") {
                    interface = "Integrated".to_string();
                }
                if key.contains("pcie") {
                    interface = "PciExpress".to_string();
                }
            }
        }
        if inxi::field_str(row, "type") == "USB" {
            interface = "USB".to_string();
        }

        let mut speed = inxi::field_str(row, "speed");
        let iface = &networks[index + 1];
        let mac = inxi::field_str(iface, "mac");
        if speed.is_empty() {
            speed = inxi::field_str(iface, "speed");
        }
        if !mac.is_empty() {
            mac_seen = true;
        }

        let mut record = ComponentRecord::new(ComponentKind::NetworkAdapter);
        record.set("model", model);
        record.set("manufacturer", inxi::field_str(row, "manufacturer"));
        record.set("serialNumber", mac);
        record.set("speed", speed);
        record.set("interface", interface);
        components.push(record);
    }
    if !mac_seen {
        warnings.push("could not retrieve a MAC address".to_string());
    }
}

fn sound_cards(inxi: &Value, components: &mut Vec<ComponentRecord>) {
    let Some(audio) = inxi::section(inxi, "Audio") else {
        return;
    };
    for row in audio {
        let model = inxi::field_str(row, "Device");
        if model.is_empty() {
            continue;
        }
        let mut record = ComponentRecord::new(ComponentKind::SoundCard);
        record.set("model", model);
        record.set("manufacturer", inxi::field_str(row, "vendor"));
        record.set("serialNumber", inxi::field_str(row, "serial"));
        components.push(record);
    }
}

// A drive spans two rows: the identification row, then a SMART row with
// wear counters. USB-attached drives are skipped.
fn storage_drives(inxi: &Value, components: &mut Vec<ComponentRecord>) {
    let Some(drives) = inxi::section(inxi, "Drives") else {
        return;
    };
    let mut pending: Option<ComponentRecord> = None;
    for row in drives {
        if inxi::field_str(row, "type") == "USB" {
            continue;
        }
        let serial = inxi::field_str(row, "serial");
        if !serial.is_empty() {
            if let Some(previous) = pending.take() {
                components.push(previous);
            }
            let mut record = ComponentRecord::new(ComponentKind::Storage);
            record.set("manufacturer", inxi::field_str(row, "vendor"));
            record.set("model", inxi::field_str(row, "model"));
            record.set("serialNumber", serial);
            record.set("size", inxi::field_str(row, "size"));
            record.set("speed", inxi::field_str(row, "speed"));
            record.set("interface", inxi::field_str(row, "tech"));
            record.set("firmware", inxi::field_str(row, "fw-rev"));
            for optional in ["rpm", "family", "sata"] {
                let value = inxi::field_str(row, optional);
                if !value.is_empty() {
                    record.set(optional, value);
                }
            }
            pending = Some(record);
            continue;
        }
        let cycles = inxi::field_str(row, "cycles");
        if !cycles.is_empty() {
            if let Some(mut record) = pending.take() {
                record.set("cycles", cycles);
                record.set("health", inxi::field_str(row, "health"));
                record.set("time of used", inxi::field_str(row, "on"));
                record.set("read used", inxi::field_str(row, "read-units"));
                record.set("written used", inxi::field_str(row, "written-units"));
                components.push(record);
            }
        }
    }
    if let Some(record) = pending.take() {
        components.push(record);
    }
}

fn batteries(inxi: &Value, components: &mut Vec<ComponentRecord>) {
    let Some(batteries) = inxi::section(inxi, "Battery") else {
        return;
    };
    for row in batteries {
        let mut record = ComponentRecord::new(ComponentKind::Battery);
        record.set("model", inxi::field_str(row, "model"));
        record.set("serialNumber", inxi::field_str(row, "serial"));
        record.set("condition", inxi::field_str(row, "condition"));
        record.set("cycles", inxi::field_str(row, "cycles"));
        record.set("volts", inxi::field_str(row, "volts"));
        components.push(record);
    }
}
