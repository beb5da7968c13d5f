//! Static product catalog: what we sell, what documents each product needs,
//! where meetings can happen and which operator section fulfils it. Nothing
//! here is runtime-mutable.

pub mod forms;

use forms::FormField;

/// Responsibility area of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    PaymentControl,
    BankCard,
    DriverLicense,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::PaymentControl, Section::BankCard, Section::DriverLicense];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::PaymentControl => "PAYMENT_CONTROL",
            Section::BankCard => "BANK_CARD",
            Section::DriverLicense => "DRIVER_LICENSE",
        }
    }

    pub fn parse(s: &str) -> Option<Section> {
        match s {
            "PAYMENT_CONTROL" => Some(Section::PaymentControl),
            "BANK_CARD" => Some(Section::BankCard),
            "DRIVER_LICENSE" => Some(Section::DriverLicense),
            _ => None,
        }
    }
}

/// Stable key of a product. Tags every service row with its subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductKey {
    BankCard,
    DriverLicense,
}

impl ProductKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductKey::BankCard => "bank_card",
            ProductKey::DriverLicense => "driver_license",
        }
    }

    pub fn parse(s: &str) -> Option<ProductKey> {
        match s {
            "bank_card" => Some(ProductKey::BankCard),
            "driver_license" => Some(ProductKey::DriverLicense),
            _ => None,
        }
    }
}

/// A place where the in-person part of a service happens.
#[derive(Debug, Clone, Copy)]
pub struct Place {
    pub name: &'static str,
    pub address: &'static str,
    pub map_link: &'static str,
}

/// One entry of the document-collection menu shown to the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocAction {
    FillForm,
    SendPassport,
    SendVisa,
    ChooseMeeting,
}

impl DocAction {
    pub fn as_str(self) -> &'static str {
        match self {
            DocAction::FillForm => "form",
            DocAction::SendPassport => "passport",
            DocAction::SendVisa => "visa",
            DocAction::ChooseMeeting => "meeting",
        }
    }

    pub fn parse(s: &str) -> Option<DocAction> {
        match s {
            "form" => Some(DocAction::FillForm),
            "passport" => Some(DocAction::SendPassport),
            "visa" => Some(DocAction::SendVisa),
            "meeting" => Some(DocAction::ChooseMeeting),
            _ => None,
        }
    }
}

pub struct Product {
    pub key: ProductKey,
    pub name: &'static str,
    pub payment_amount: &'static str,
    pub terms: &'static str,
    pub preparation: &'static str,
    /// Document-collection actions in menu order, with button labels.
    pub actions: &'static [(DocAction, &'static str)],
    pub places: &'static [Place],
    /// Operator section that fulfils this product.
    pub section: Section,
}

impl Product {
    pub fn form(&self) -> &'static [FormField] {
        match self.key {
            ProductKey::BankCard => &forms::BANK_CARD_FORM,
            ProductKey::DriverLicense => &forms::DRIVER_LICENSE_FORM,
        }
    }

    pub fn place(&self, index: usize) -> Option<&'static Place> {
        self.places.get(index)
    }

    pub fn place_by_address(&self, address: &str) -> Option<&'static Place> {
        self.places.iter().find(|p| p.address == address)
    }
}

const BANK_CARD_TERMS: &str = "\
Условия открытия банковского счета Permata.

Стоимость: 2.000.000 IDR | 140$
Срок изготовления: 1 час на следующий день после оформления заявления официально в банке (исключения праздники и выходные)

Вид счета:
  1. Индонезийский счет: IDR
  2. Мультивалютный счет: EUR, USD, CNY (не снижаемый депозит в 1.000.000 IDR. При закрытии депозит возвращается)

Лимиты:
- Снятие наличных:
    до 5000$ без комиссии в месяц
    до 10.000.000 IDR в сутки
    (если больше, то 0,5% комиссия)
+ Пополнение:
    лимитов нет

Мобильный банк:
  + Работает по всему миру
  + Возможность пополнения через p2p
  + SWIFT

Как получить услугу?
  1. Нажмите [ Начать оформление ]
  2. Оплатите услугу
  3. Пришлите данные, которые попросит бот
  4. Приходите на встречу в назначенное время";

const BANK_CARD_PREPARATION: &str = "\
Для оформления банковской карты нужна следующая информация:

1. Нужно заполнить анкету для Банка
2. Нужно прислать фото паспорта

Выберите, что вы хотите сделать:";

const DRIVER_LICENSE_TERMS: &str = "\
Условия оформления водительских прав в Индонезии:

◾ Водительское удостоверение в Индонезии представляет собой 1 документ на 1 категорию.
◾ Получение происходит официально в ГАИ при личном посещении.
◾ Действуют официально 2 года на территории Индонезии и Малайзии.
◾ Дополнительным преимуществом наличия местных водительских прав является:
    + получение скидок для посещения различных мероприятий
    + возможность верификаций на платежных и игровых системах

Как получить услугу?
  1. Нажмите [ Начать оформление ]
  2. Оплатите услугу
  3. Пришлите данные, которые попросит бот
  4. Приходите на встречу в назначенное время";

const DRIVER_LICENSE_PREPARATION: &str = "\
Для оформления водительских прав нужна следующая информация:

1. Нужно заполнить анкету
2. Нужно прислать фото паспорта
3. Нужно прислать электронную визу
4. Нужно выбрать место и время встречи

Выберите, что вы хотите сделать:";

pub static PRODUCTS: [Product; 2] = [
    Product {
        key: ProductKey::BankCard,
        name: "Оформление карты Permata",
        payment_amount: "140$",
        terms: BANK_CARD_TERMS,
        preparation: BANK_CARD_PREPARATION,
        actions: &[
            (DocAction::FillForm, "Анкета для Банка"),
            (DocAction::SendPassport, "Фото паспорта"),
        ],
        places: &[
            Place {
                name: "Permata Bank Sunset Road",
                address: "Jl. Sunset Road No.819, Kuta",
                map_link: "https://maps.app.goo.gl/permata-sunset",
            },
            Place {
                name: "Permata Bank Denpasar",
                address: "Jl. Teuku Umar No.210, Denpasar",
                map_link: "https://maps.app.goo.gl/permata-denpasar",
            },
        ],
        section: Section::BankCard,
    },
    Product {
        key: ProductKey::DriverLicense,
        name: "Оформление водительских прав",
        payment_amount: "140$",
        terms: DRIVER_LICENSE_TERMS,
        preparation: DRIVER_LICENSE_PREPARATION,
        actions: &[
            (DocAction::FillForm, "Анкета"),
            (DocAction::SendPassport, "Фото паспорта"),
            (DocAction::SendVisa, "Электронная виза"),
            (DocAction::ChooseMeeting, "Место встречи"),
        ],
        places: &[
            Place {
                name: "ГАИ Денпасар (Polresta)",
                address: "Jl. Gunung Sanghyang No.110, Denpasar",
                map_link: "https://maps.app.goo.gl/satpas-denpasar",
            },
            Place {
                name: "ГАИ Табанан",
                address: "Jl. Pulau Batam No.57, Tabanan",
                map_link: "https://maps.app.goo.gl/satpas-tabanan",
            },
        ],
        section: Section::DriverLicense,
    },
];

pub fn product(key: ProductKey) -> &'static Product {
    match key {
        ProductKey::BankCard => &PRODUCTS[0],
        ProductKey::DriverLicense => &PRODUCTS[1],
    }
}

pub fn product_by_name(name: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_lookup_by_key_and_name() {
        for p in &PRODUCTS {
            assert_eq!(product(p.key).key, p.key);
            assert_eq!(product_by_name(p.name).unwrap().key, p.key);
        }
        assert!(product_by_name("Оформление визы").is_none());
    }

    #[test]
    fn every_product_has_places_and_actions() {
        for p in &PRODUCTS {
            assert!(!p.places.is_empty());
            assert!(p.actions.iter().any(|(a, _)| *a == DocAction::FillForm));
            assert!(p.actions.iter().any(|(a, _)| *a == DocAction::SendPassport));
        }
    }

    #[test]
    fn meeting_is_chosen_by_customer_only_for_driver_license() {
        let has_meeting = |key: ProductKey| {
            product(key)
                .actions
                .iter()
                .any(|(a, _)| *a == DocAction::ChooseMeeting)
        };
        assert!(!has_meeting(ProductKey::BankCard));
        assert!(has_meeting(ProductKey::DriverLicense));
    }

    #[test]
    fn place_lookup_by_address() {
        let p = product(ProductKey::DriverLicense);
        let place = p.places[1];
        assert_eq!(p.place_by_address(place.address).unwrap().name, place.name);
        assert!(p.place_by_address("nowhere").is_none());
    }
}
