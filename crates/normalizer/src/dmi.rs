#![forbid(unsafe_code)]

use std::collections::BTreeMap;

// dmidecode output: every structure opens with a handle line naming its DMI
// type, then a title line, then tab-indented "Key: Value" attributes.
// Deeper-indented list items carry no key and are skipped here.
const DMI_TYPE_NAMES: &[(u32, &str)] = &[
    (0, "BIOS"),
    (1, "System"),
    (2, "Baseboard"),
    (3, "Chassis"),
    (4, "Processor"),
    (8, "Port Connector"),
    (16, "Physical Memory Array"),
    (17, "Memory Device"),
];

#[derive(Clone, Debug, Default)]
pub(crate) struct DmiTable {
    sections: BTreeMap<String, Vec<BTreeMap<String, String>>>,
}

impl DmiTable {
    pub(crate) fn parse(raw: &str) -> Self {
        let mut table = DmiTable::default();
        let mut current: Option<(String, BTreeMap<String, String>)> = None;

        for line in raw.lines() {
            if let Some(rest) = line.strip_prefix("Handle ") {
                table.flush(current.take());
                current = handle_type(rest)
                    .and_then(type_name)
                    .map(|name| (name.to_string(), BTreeMap::new()));
                continue;
            }
            let Some((_, fields)) = current.as_mut() else {
                continue;
            };
            if !line.starts_with('\t') || line.starts_with("\t\t") {
                continue;
            }
            if let Some((key, value)) = line[1..].split_once(':') {
                fields.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        table.flush(current.take());
        table
    }

    fn flush(&mut self, section: Option<(String, BTreeMap<String, String>)>) {
        if let Some((name, fields)) = section {
            self.sections.entry(name).or_default().push(fields);
        }
    }

    pub(crate) fn get(&self, name: &str) -> &[BTreeMap<String, String>] {
        self.sections.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn first_value(&self, section: &str, key: &str) -> Option<String> {
        self.get(section)
            .first()
            .and_then(|fields| fields.get(key))
            .map(|value| value.trim().to_string())
    }

    pub(crate) fn manufacturer(&self) -> String {
        self.first_value("System", "Manufacturer").unwrap_or_default()
    }

    pub(crate) fn model(&self) -> String {
        self.first_value("System", "Product Name").unwrap_or_default()
    }

    pub(crate) fn serial_number(&self) -> String {
        self.first_value("System", "Serial Number").unwrap_or_default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

fn handle_type(rest: &str) -> Option<u32> {
    let marker = rest.find("DMI type ")?;
    let digits: String = rest[marker + "DMI type ".len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn type_name(dmi_type: u32) -> Option<&'static str> {
    DMI_TYPE_NAMES
        .iter()
        .find(|(id, _)| *id == dmi_type)
        .map(|(_, name)| *name)
}
