//! Expands the plugin entry point macros the way a custom item library does,
//! then calls the generated functions directly.
use rdlcore::{
    base::{
        engine_version,
        ext::{CustomItemExt, CustomItemExtStatic},
    },
    define_custom_item_compatibility, define_custom_item_loader,
    item::{
        CustomItemMarkup, CustomProperties, CustomReportItem, ExtensionResult, PropertyMap, Rgba,
        Surface,
    },
    utils::{error::RdlError, opaque::OpaqueObject},
};
use rdlexpr::context::CancelToken;
use semver::Version;
use uuid::{Uuid, uuid};

define_custom_item_compatibility!("^0.1");

define_custom_item_loader!(Gauge, Sparkline);

#[derive(Debug)]
struct NoProperties;

impl OpaqueObject for NoProperties {}

struct Needle;

impl CustomReportItem for Needle {
    fn is_data_region(&self) -> bool {
        false
    }

    fn set_properties(&mut self, _properties: &PropertyMap, _cancel: &CancelToken) -> ExtensionResult<()> {
        Ok(())
    }

    fn draw_image(&mut self, surface: &mut Surface, _cancel: &CancelToken) -> ExtensionResult<()> {
        surface.set(0, 0, Rgba::BLACK);
        Ok(())
    }

    fn draw_designer_image(&mut self, surface: &mut Surface) -> ExtensionResult<()> {
        surface.fill(Rgba::WHITE);
        Ok(())
    }

    fn get_properties_instance(&self, _markup: &CustomProperties) -> Box<dyn OpaqueObject> {
        Box::new(NoProperties)
    }

    fn set_properties_instance(
        &self,
        _markup: &mut CustomProperties,
        _instance: &dyn OpaqueObject,
    ) -> ExtensionResult<()> {
        Ok(())
    }

    fn custom_report_item_xml(&self) -> String {
        CustomItemMarkup::new("Gauge", CustomProperties::new()).to_xml()
    }
}

macro_rules! define_test_ext {
    ($name:ident, $uuid:literal, $version:literal) => {
        struct $name {
            version: Version,
        }

        impl CustomItemExtStatic for $name {
            const UUID: Uuid = uuid!($uuid);

            fn new() -> Self {
                Self {
                    version: Version::parse($version).unwrap(),
                }
            }
        }

        impl CustomItemExt for $name {
            fn uuid(&self) -> Uuid {
                Self::UUID
            }

            fn version(&self) -> &Version {
                &self.version
            }

            fn name(&self) -> &str {
                stringify!($name)
            }

            fn description(&self) -> &str {
                "Test item"
            }

            fn create(&self) -> Box<dyn CustomReportItem> {
                Box::new(Needle)
            }
        }
    };
}

define_test_ext!(Gauge, "3f2b8c1e-6a47-4d0e-9c55-1b7e2f0a9d31", "0.3.1");
define_test_ext!(Sparkline, "8d0c4e2a-91f3-4b6d-a7e8-52c9f1b3e604", "1.0.0");

#[test]
fn loader_builds_the_extension_matching_the_uuid() {
    let gauge = unsafe { __rdlext_fn_loader(Gauge::UUID) }.unwrap();
    assert_eq!(gauge.uuid(), Gauge::UUID);
    assert_eq!(gauge.name(), "Gauge");
    assert_eq!(gauge.version(), &Version::new(0, 3, 1));

    let sparkline = unsafe { __rdlext_fn_loader(Sparkline::UUID) }.unwrap();
    assert_eq!(sparkline.name(), "Sparkline");

    let mut item = gauge.create();
    let mut surface = Surface::new(2, 2);
    item.draw_image(&mut surface, &CancelToken::new()).unwrap();
    assert_eq!(surface.painted(), 1);
}

#[test]
fn loader_rejects_unknown_uuids() {
    let unknown = Uuid::new_v4();
    let err = unsafe { __rdlext_fn_loader(unknown) }.err().unwrap();
    assert!(matches!(err, RdlError::ExtensionNotFound(ref id) if *id == unknown.to_string()));
}

#[test]
fn compatibility_requirement_matches_the_engine() {
    let req = __rdlext_fn_compatibility_check();
    assert!(req.matches(&engine_version().unwrap()));
    assert!(req.matches(&Version::new(0, 1, 7)));
    assert!(!req.matches(&Version::new(0, 2, 0)));
    assert!(!req.matches(&Version::new(1, 0, 0)));
}
