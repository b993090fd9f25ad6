//! Billomat resource table
//!
//! Every collection the API exposes is addressed by a URL path segment
//! (`invoice-items`) and wraps its records under a singular data key
//! (`invoice-item`). Child collections additionally name the foreign key
//! used to filter them by parent (`invoice_id`).

use crate::error::{Error, Result};

/// One collection type exposed by the Billomat API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resource {
    /// URL path segment, also the top-level key of list responses
    pub path: &'static str,
    /// Key wrapping the records inside the response envelope
    pub data_key: &'static str,
    /// Query parameter that scopes this resource to one parent
    pub parent_key: Option<&'static str>,
}

impl Resource {
    /// Create a top-level resource
    pub const fn new(path: &'static str, data_key: &'static str) -> Self {
        Self {
            path,
            data_key,
            parent_key: None,
        }
    }

    /// Create a resource scoped to a parent by `parent_key`
    pub const fn child(
        path: &'static str,
        data_key: &'static str,
        parent_key: &'static str,
    ) -> Self {
        Self {
            path,
            data_key,
            parent_key: Some(parent_key),
        }
    }

    /// Look up a resource by its path
    pub fn find(path: &str) -> Option<Resource> {
        ALL.iter().copied().find(|r| r.path == path)
    }

    /// Look up a resource by its path, failing for unknown names
    pub fn parse(path: &str) -> Result<Resource> {
        Self::find(path).ok_or_else(|| Error::unknown_resource(path))
    }

    /// Path of a single record, e.g. `invoices/42`
    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.path, id)
    }

    /// Path of an action on a single record, e.g. `invoices/42/complete`
    pub fn action_path(&self, id: &str, action: &str) -> String {
        format!("{}/{}/{}", self.path, id, action)
    }

    /// Whether this resource can be batched by parent id
    pub fn is_child(&self) -> bool {
        self.parent_key.is_some()
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path)
    }
}

// Clients
pub const CLIENTS: Resource = Resource::new("clients", "client");
pub const CLIENT_PROPERTIES: Resource =
    Resource::new("client-property-values", "client-property-value");
pub const CLIENT_TAGS: Resource = Resource::child("client-tags", "client-tag", "client_id");
pub const CONTACTS: Resource = Resource::child("contacts", "contact", "client_id");

// Suppliers
pub const SUPPLIERS: Resource = Resource::new("suppliers", "supplier");
pub const SUPPLIER_PROPERTIES: Resource =
    Resource::new("supplier-property-values", "supplier-property-value");
pub const SUPPLIER_TAGS: Resource = Resource::child("supplier-tags", "supplier-tag", "supplier_id");

// Articles and units
pub const ARTICLES: Resource = Resource::new("articles", "article");
pub const ARTICLE_PROPERTIES: Resource =
    Resource::new("article-property-values", "article-property-value");
pub const ARTICLE_TAGS: Resource = Resource::child("article-tags", "article-tag", "article_id");
pub const UNITS: Resource = Resource::new("units", "unit");

// Invoices
pub const INVOICES: Resource = Resource::new("invoices", "invoice");
pub const INVOICE_ITEMS: Resource = Resource::child("invoice-items", "invoice-item", "invoice_id");
pub const INVOICE_COMMENTS: Resource =
    Resource::child("invoice-comments", "invoice-comment", "invoice_id");
pub const INVOICE_PAYMENTS: Resource =
    Resource::child("invoice-payments", "invoice-payment", "invoice_id");
pub const INVOICE_TAGS: Resource = Resource::child("invoice-tags", "invoice-tag", "invoice_id");

// Recurring invoices
pub const RECURRINGS: Resource = Resource::new("recurrings", "recurring");
pub const RECURRING_ITEMS: Resource =
    Resource::child("recurring-items", "recurring-item", "recurring_id");
pub const RECURRING_TAGS: Resource =
    Resource::child("recurring-tags", "recurring-tag", "recurring_id");
pub const RECURRING_EMAIL_RECEIVERS: Resource = Resource::child(
    "recurring-email-receivers",
    "recurring-email-receiver",
    "recurring_id",
);

// Incoming invoices
pub const INCOMINGS: Resource = Resource::new("incomings", "incoming");
pub const INCOMING_COMMENTS: Resource =
    Resource::child("incoming-comments", "incoming-comment", "incoming_id");
pub const INCOMING_PAYMENTS: Resource =
    Resource::child("incoming-payments", "incoming-payment", "incoming_id");
pub const INCOMING_PROPERTIES: Resource =
    Resource::new("incoming-property-values", "incoming-property-value");
pub const INCOMING_TAGS: Resource = Resource::child("incoming-tags", "incoming-tag", "incoming_id");
pub const INBOX_DOCUMENTS: Resource = Resource::new("inbox-documents", "inbox-document");

// Estimates
pub const OFFERS: Resource = Resource::new("offers", "offer");
pub const OFFER_ITEMS: Resource = Resource::child("offer-items", "offer-item", "offer_id");
pub const OFFER_COMMENTS: Resource = Resource::child("offer-comments", "offer-comment", "offer_id");
pub const OFFER_TAGS: Resource = Resource::child("offer-tags", "offer-tag", "offer_id");

// Credit notes
pub const CREDIT_NOTES: Resource = Resource::new("credit-notes", "credit-note");
pub const CREDIT_NOTE_ITEMS: Resource =
    Resource::child("credit-note-items", "credit-note-item", "credit_note_id");
pub const CREDIT_NOTE_COMMENTS: Resource =
    Resource::child("credit-note-comments", "credit-note-comment", "credit_note_id");
pub const CREDIT_NOTE_PAYMENTS: Resource =
    Resource::child("credit-note-payments", "credit-note-payment", "credit_note_id");
pub const CREDIT_NOTE_TAGS: Resource =
    Resource::child("credit-note-tags", "credit-note-tag", "credit_note_id");

// Order confirmations
pub const CONFIRMATIONS: Resource = Resource::new("confirmations", "confirmation");
pub const CONFIRMATION_ITEMS: Resource =
    Resource::child("confirmation-items", "confirmation-item", "confirmation_id");
pub const CONFIRMATION_COMMENTS: Resource =
    Resource::child("confirmation-comments", "confirmation-comment", "confirmation_id");
pub const CONFIRMATION_TAGS: Resource =
    Resource::child("confirmation-tags", "confirmation-tag", "confirmation_id");

// Reminders
pub const REMINDERS: Resource = Resource::new("reminders", "reminder");
pub const REMINDER_ITEMS: Resource =
    Resource::child("reminder-items", "reminder-item", "reminder_id");
pub const REMINDER_TAGS: Resource = Resource::child("reminder-tags", "reminder-tag", "reminder_id");

// Delivery notes
pub const DELIVERY_NOTES: Resource = Resource::new("delivery-notes", "delivery-note");
pub const DELIVERY_NOTE_ITEMS: Resource =
    Resource::child("delivery-note-items", "delivery-note-item", "delivery_note_id");
pub const DELIVERY_NOTE_COMMENTS: Resource = Resource::child(
    "delivery-note-comments",
    "delivery-note-comment",
    "delivery_note_id",
);
pub const DELIVERY_NOTE_TAGS: Resource =
    Resource::child("delivery-note-tags", "delivery-note-tag", "delivery_note_id");

// Letters and templates
pub const LETTERS: Resource = Resource::new("letters", "letter");
pub const LETTER_COMMENTS: Resource =
    Resource::child("letter-comments", "letter-comment", "letter_id");
pub const LETTER_TAGS: Resource = Resource::child("letter-tags", "letter-tag", "letter_id");
pub const TEMPLATES: Resource = Resource::new("templates", "template");

/// Every known resource
pub static ALL: &[Resource] = &[
    CLIENTS,
    CLIENT_PROPERTIES,
    CLIENT_TAGS,
    CONTACTS,
    SUPPLIERS,
    SUPPLIER_PROPERTIES,
    SUPPLIER_TAGS,
    ARTICLES,
    ARTICLE_PROPERTIES,
    ARTICLE_TAGS,
    UNITS,
    INVOICES,
    INVOICE_ITEMS,
    INVOICE_COMMENTS,
    INVOICE_PAYMENTS,
    INVOICE_TAGS,
    RECURRINGS,
    RECURRING_ITEMS,
    RECURRING_TAGS,
    RECURRING_EMAIL_RECEIVERS,
    INCOMINGS,
    INCOMING_COMMENTS,
    INCOMING_PAYMENTS,
    INCOMING_PROPERTIES,
    INCOMING_TAGS,
    INBOX_DOCUMENTS,
    OFFERS,
    OFFER_ITEMS,
    OFFER_COMMENTS,
    OFFER_TAGS,
    CREDIT_NOTES,
    CREDIT_NOTE_ITEMS,
    CREDIT_NOTE_COMMENTS,
    CREDIT_NOTE_PAYMENTS,
    CREDIT_NOTE_TAGS,
    CONFIRMATIONS,
    CONFIRMATION_ITEMS,
    CONFIRMATION_COMMENTS,
    CONFIRMATION_TAGS,
    REMINDERS,
    REMINDER_ITEMS,
    REMINDER_TAGS,
    DELIVERY_NOTES,
    DELIVERY_NOTE_ITEMS,
    DELIVERY_NOTE_COMMENTS,
    DELIVERY_NOTE_TAGS,
    LETTERS,
    LETTER_COMMENTS,
    LETTER_TAGS,
    TEMPLATES,
];
