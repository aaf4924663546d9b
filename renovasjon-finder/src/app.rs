use chrono::Local;
use renovasjon_core::{
    model::{CollectionEvent, DateRange, Property},
    scheduler::LOOKAHEAD_DAYS,
};

use crate::lookup::PropertyLookup;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Screen {
    AddressSearch,
    PropertyView,
}

pub(crate) struct App {
    pub lookup: PropertyLookup,
    pub upstream_name: String,

    pub screen: Screen,

    pub address_input: String,
    pub properties: Vec<Property>,
    pub property_list_index: usize,
    pub selected_property: Option<Property>,

    pub collections: Vec<CollectionEvent>,

    pub is_loading: bool,
    pub error_message: Option<String>,
}

impl App {
    pub(crate) fn new(lookup: PropertyLookup, upstream_name: String) -> Self {
        Self {
            lookup,
            upstream_name,
            screen: Screen::AddressSearch,
            address_input: String::new(),
            properties: Vec::new(),
            property_list_index: 0,
            selected_property: None,
            collections: Vec::new(),
            is_loading: false,
            error_message: None,
        }
    }

    pub(crate) fn current_range() -> DateRange {
        DateRange::lookahead(Local::now().date_naive(), LOOKAHEAD_DAYS)
    }

    pub(crate) fn select_current_property(&mut self) -> Option<Property> {
        let property = self.properties.get(self.property_list_index).cloned()?;
        self.selected_property = Some(property.clone());
        self.screen = Screen::PropertyView;
        Some(property)
    }
}
