use std::fmt;

/// Wire type tag carried by every variant (`QMetaType` ids).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum TypeTag {
    Void = 0,
    Bool = 1,
    Int = 2,
    UInt = 3,
    LongLong = 4,
    ULongLong = 5,
    Double = 6,
    QChar = 7,
    QVariantMap = 8,
    QVariantList = 9,
    QString = 10,
    QStringList = 11,
    QByteArray = 12,
    QBitArray = 13,
    QDate = 14,
    QTime = 15,
    QDateTime = 16,
    UserType = 127,
    Long = 129,
    Short = 130,
    Char = 131,
    ULong = 132,
    UShort = 133,
    UChar = 134,
    Float = 135,
    QVariant = 138,
}

impl TypeTag {
    /// Every tag the protocol defines, in wire-id order.
    pub const ALL: [TypeTag; 26] = [
        TypeTag::Void,
        TypeTag::Bool,
        TypeTag::Int,
        TypeTag::UInt,
        TypeTag::LongLong,
        TypeTag::ULongLong,
        TypeTag::Double,
        TypeTag::QChar,
        TypeTag::QVariantMap,
        TypeTag::QVariantList,
        TypeTag::QString,
        TypeTag::QStringList,
        TypeTag::QByteArray,
        TypeTag::QBitArray,
        TypeTag::QDate,
        TypeTag::QTime,
        TypeTag::QDateTime,
        TypeTag::UserType,
        TypeTag::Long,
        TypeTag::Short,
        TypeTag::Char,
        TypeTag::ULong,
        TypeTag::UShort,
        TypeTag::UChar,
        TypeTag::Float,
        TypeTag::QVariant,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|tag| tag.id() == id)
    }

    /// Qt type name, as used in logs and in semantic values.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Void => "Void",
            TypeTag::Bool => "Bool",
            TypeTag::Int => "Int",
            TypeTag::UInt => "UInt",
            TypeTag::LongLong => "LongLong",
            TypeTag::ULongLong => "ULongLong",
            TypeTag::Double => "Double",
            TypeTag::QChar => "QChar",
            TypeTag::QVariantMap => "QVariantMap",
            TypeTag::QVariantList => "QVariantList",
            TypeTag::QString => "QString",
            TypeTag::QStringList => "QStringList",
            TypeTag::QByteArray => "QByteArray",
            TypeTag::QBitArray => "QBitArray",
            TypeTag::QDate => "QDate",
            TypeTag::QTime => "QTime",
            TypeTag::QDateTime => "QDateTime",
            TypeTag::UserType => "UserType",
            TypeTag::Long => "Long",
            TypeTag::Short => "Short",
            TypeTag::Char => "Char",
            TypeTag::ULong => "ULong",
            TypeTag::UShort => "UShort",
            TypeTag::UChar => "UChar",
            TypeTag::Float => "Float",
            TypeTag::QVariant => "QVariant",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.id())
    }
}
