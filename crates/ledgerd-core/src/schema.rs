//! Declarative table descriptors
//!
//! Every persisted entity is described exactly once as a table name plus an
//! ordered field list. Table creation is generated from the descriptors and
//! the storage engine's generic CRUD iterates them instead of naming columns.
//!
//! The schema is closed: adding an entity means adding a descriptor here and
//! listing it in [`TABLES`].

/// Column value types understood by the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    /// 64-bit integer (epoch timestamps). Stored identically to `Integer`,
    /// kept distinct so descriptors document intent.
    Long,
    Real,
    Text,
}

impl FieldKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Integer | FieldKind::Long => "INTEGER",
            FieldKind::Real => "REAL",
            FieldKind::Text => "TEXT",
        }
    }
}

/// A single column of a table descriptor.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub primary_key: bool,
    pub autoincrement: bool,
}

/// A table descriptor: the single source of truth the generic CRUD walks.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
}

const fn id() -> FieldDef {
    FieldDef {
        name: "id",
        kind: FieldKind::Integer,
        primary_key: true,
        autoincrement: true,
    }
}

const fn integer(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Integer,
        primary_key: false,
        autoincrement: false,
    }
}

const fn long(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Long,
        primary_key: false,
        autoincrement: false,
    }
}

const fn real(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Real,
        primary_key: false,
        autoincrement: false,
    }
}

const fn text(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Text,
        primary_key: false,
        autoincrement: false,
    }
}

impl TableDef {
    /// `CREATE TABLE IF NOT EXISTS` text for this descriptor.
    ///
    /// Column names are always double-quoted so that names like `match`
    /// never collide with SQL keywords.
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .fields
            .iter()
            .map(|f| {
                let mut col = format!("\"{}\" {}", f.name, f.kind.sql_type());
                if f.primary_key {
                    col.push_str(" PRIMARY KEY");
                }
                if f.autoincrement {
                    col.push_str(" AUTOINCREMENT");
                }
                col
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({});",
            self.name,
            columns.join(", ")
        )
    }

    pub fn primary_key(&self) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// All non-primary-key fields, in declaration order.
    pub fn data_fields(&self) -> impl Iterator<Item = &'static FieldDef> {
        self.fields.iter().filter(|f| !f.primary_key)
    }
}

/// Raw inbound payload captured by a companion app.
pub static APP_DATA: TableDef = TableDef {
    name: "appData",
    fields: &[
        id(),
        text("data"),
        text("source"),
        long("time"),
        integer("match"),
        text("rule"),
        integer("issue"),
        integer("type"),
    ],
};

/// Named accounts.
pub static ASSETS: TableDef = TableDef {
    name: "assets",
    fields: &[
        id(),
        text("name"),
        text("icon"),
        integer("sort"),
        integer("type"),
        text("extras"),
    ],
};

/// Account-name normalization rules.
pub static ASSETS_MAP: TableDef = TableDef {
    name: "assetsMap",
    fields: &[id(), integer("regex"), text("name"), text("mapName")],
};

/// Per-companion-app credentials.
pub static AUTH: TableDef = TableDef {
    name: "auth",
    fields: &[id(), text("app"), text("token")],
};

/// A classified transaction.
pub static BILL_INFO: TableDef = TableDef {
    name: "billInfo",
    fields: &[
        id(),
        integer("type"),
        text("currency"),
        real("money"),
        real("fee"),
        long("time"),
        text("shopName"),
        text("shopItem"),
        text("cateName"),
        text("extendData"),
        text("bookName"),
        text("accountNameFrom"),
        text("accountNameTo"),
        text("fromApp"),
        integer("groupId"),
        text("channel"),
        integer("syncFromApp"),
        text("remark"),
        integer("auto"),
    ],
};

/// Externally-sourced reference bill used for reconciliation.
pub static BOOK_BILL: TableDef = TableDef {
    name: "bookBill",
    fields: &[
        id(),
        real("amount"),
        long("time"),
        text("remark"),
        text("billId"),
        integer("type"),
        text("book"),
        text("category"),
        text("accountFrom"),
        text("accountTo"),
    ],
};

/// Logical ledger.
pub static BOOK_NAME: TableDef = TableDef {
    name: "bookName",
    fields: &[id(), text("name"), text("icon")],
};

/// Hierarchical category (`parent = 0` means root).
pub static CATEGORY: TableDef = TableDef {
    name: "category",
    fields: &[
        id(),
        text("name"),
        text("icon"),
        text("remoteId"),
        integer("parent"),
        integer("book"),
        integer("sort"),
        integer("type"),
    ],
};

/// User-defined classification rule.
pub static CUSTOM_RULE: TableDef = TableDef {
    name: "customRule",
    fields: &[
        id(),
        integer("use"),
        integer("sort"),
        integer("auto_create"),
        text("js"),
        text("text"),
        text("element"),
    ],
};

/// Structured log line.
pub static LOG: TableDef = TableDef {
    name: "log",
    fields: &[
        id(),
        text("date"),
        text("app"),
        integer("hook"),
        integer("level"),
        text("thread"),
        text("line"),
        text("log"),
    ],
};

/// Enabled-rule registration.
pub static RULE: TableDef = TableDef {
    name: "rule",
    fields: &[
        id(),
        text("app"),
        integer("type"),
        integer("use"),
        integer("auto_record"),
        text("name"),
    ],
};

/// Per-app key/value settings bag. Uniqueness of `(app, key)` is enforced
/// by the handler layer's insert-or-update, not by the schema.
pub static SETTINGS: TableDef = TableDef {
    name: "settings",
    fields: &[id(), text("app"), text("key"), text("val")],
};

/// Every table the storage engine creates at startup.
pub static TABLES: &[&TableDef] = &[
    &APP_DATA,
    &ASSETS,
    &ASSETS_MAP,
    &AUTH,
    &BILL_INFO,
    &BOOK_BILL,
    &BOOK_NAME,
    &CATEGORY,
    &CUSTOM_RULE,
    &LOG,
    &RULE,
    &SETTINGS,
];

/// Look a descriptor up by table name.
pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name).copied()
}
