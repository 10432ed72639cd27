use std::fmt::Write as _;

use uuid::Uuid;

/// Serial Port service class / profile (0x1101)
pub const SERIAL_PORT_CLASS: Uuid = Uuid::from_u128(0x0000_1101_0000_1000_8000_0080_5f9b_34fb);
pub const SERIAL_PORT_PROFILE_VERSION: u16 = 0x0100;

pub const DEFAULT_SERVICE_NAME: &str = "SerialBridge";
pub const DEFAULT_DESCRIPTION: &str = "Serial-to-Bluetooth Bridge";
pub const DEFAULT_CHANNEL: u8 = 1;

// SDP attribute and protocol identifiers
const ATTR_SERVICE_CLASS_ID_LIST: u16 = 0x0001;
const ATTR_SERVICE_ID: u16 = 0x0003;
const ATTR_PROTOCOL_DESCRIPTOR_LIST: u16 = 0x0004;
const ATTR_BROWSE_GROUP_LIST: u16 = 0x0005;
const ATTR_PROFILE_DESCRIPTOR_LIST: u16 = 0x0009;
const ATTR_SERVICE_NAME: u16 = 0x0100;
const ATTR_SERVICE_DESCRIPTION: u16 = 0x0101;
const L2CAP_UUID16: u16 = 0x0100;
const RFCOMM_UUID16: u16 = 0x0003;
const PUBLIC_BROWSE_GROUP_UUID16: u16 = 0x1002;

/// The service record published while a listener is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAdvertisement {
    pub service_id: Uuid,
    pub name: String,
    pub description: String,
    pub channel: u8,
}

impl ServiceAdvertisement {
    pub fn new(service_id: Uuid) -> Self {
        Self {
            service_id,
            name: DEFAULT_SERVICE_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            channel: DEFAULT_CHANNEL,
        }
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// The configured service first, then the standard serial port class.
    pub fn service_classes(&self) -> [Uuid; 2] {
        [self.service_id, SERIAL_PORT_CLASS]
    }

    /// (profile, version) pairs
    pub fn profiles(&self) -> [(Uuid, u16); 1] {
        [(SERIAL_PORT_CLASS, SERIAL_PORT_PROFILE_VERSION)]
    }

    /// BlueZ XML service record for this advertisement.
    pub fn sdp_record(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<record>\n");

        open_attr(&mut xml, ATTR_SERVICE_CLASS_ID_LIST);
        xml.push_str("    <sequence>\n");
        for class in self.service_classes() {
            let _ = writeln!(xml, "      <uuid value=\"{}\" />", uuid_value(class));
        }
        xml.push_str("    </sequence>\n");
        close_attr(&mut xml);

        open_attr(&mut xml, ATTR_SERVICE_ID);
        let _ = writeln!(xml, "    <uuid value=\"{}\" />", self.service_id.hyphenated());
        close_attr(&mut xml);

        open_attr(&mut xml, ATTR_PROTOCOL_DESCRIPTOR_LIST);
        xml.push_str("    <sequence>\n");
        let _ = writeln!(
            xml,
            "      <sequence><uuid value=\"0x{:04x}\" /></sequence>",
            L2CAP_UUID16
        );
        let _ = writeln!(
            xml,
            "      <sequence><uuid value=\"0x{:04x}\" /><uint8 value=\"0x{:02x}\" /></sequence>",
            RFCOMM_UUID16, self.channel
        );
        xml.push_str("    </sequence>\n");
        close_attr(&mut xml);

        open_attr(&mut xml, ATTR_BROWSE_GROUP_LIST);
        let _ = writeln!(
            xml,
            "    <sequence><uuid value=\"0x{:04x}\" /></sequence>",
            PUBLIC_BROWSE_GROUP_UUID16
        );
        close_attr(&mut xml);

        open_attr(&mut xml, ATTR_PROFILE_DESCRIPTOR_LIST);
        xml.push_str("    <sequence>\n");
        for (profile, version) in self.profiles() {
            let _ = writeln!(
                xml,
                "      <sequence><uuid value=\"{}\" /><uint16 value=\"0x{:04x}\" /></sequence>",
                uuid_value(profile),
                version
            );
        }
        xml.push_str("    </sequence>\n");
        close_attr(&mut xml);

        open_attr(&mut xml, ATTR_SERVICE_NAME);
        let _ = writeln!(xml, "    <text value=\"{}\" />", escape_xml(&self.name));
        close_attr(&mut xml);

        open_attr(&mut xml, ATTR_SERVICE_DESCRIPTION);
        let _ = writeln!(xml, "    <text value=\"{}\" />", escape_xml(&self.description));
        close_attr(&mut xml);

        xml.push_str("</record>\n");
        xml
    }
}

fn open_attr(xml: &mut String, id: u16) {
    let _ = writeln!(xml, "  <attribute id=\"0x{:04x}\">", id);
}

fn close_attr(xml: &mut String) {
    xml.push_str("  </attribute>\n");
}

/// SIG-assigned UUIDs are written in their 16-bit short form.
fn uuid_value(uuid: Uuid) -> String {
    const BASE_MASK: u128 = !(0xffff_ffffu128 << 96);
    const BASE: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;
    let value = uuid.as_u128();
    if value & BASE_MASK == BASE && value >> 112 == 0 {
        format!("0x{:04x}", value >> 96)
    } else {
        uuid.hyphenated().to_string()
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
