//! User-facing reply texts. Kept in one place so operators can proof-read
//! the wording without digging through handlers.

pub const START_TEXT: &str = "\
Добро пожаловать!

Используйте кнопки внизу экрана, чтобы ознакомиться с нашими услугами";

pub const HELP_TEXT: &str = "\
Бот оформляет документы в Индонезии.

Выберите услугу кнопкой внизу экрана, оплатите её и пришлите данные, \
которые попросит бот. Оператор назначит вам встречу.

Если что-то пошло не так — начните оформление заново через /start";

pub const HELP_FOR_ADMIN_TEXT: &str = "\
/operator - запрос на доступ для оператора

/all_operators - посмотреть всех операторов";

pub const FALLBACK_TEXT: &str = "\
Извините, не могу это обработать.

Если вы что-то заполняли, попробуйте начать с начала.

Используйте /help если у вас остались вопросы.";

pub const SOMETHING_WENT_WRONG_TEXT: &str =
    "Извините, произошла ошибка. Пожалуйста, попробуйте еще раз.";

pub const WAITING_CUSTOMER_NAME_TEXT: &str = "Пришлите имя, на кого вы оформляете услугу";

pub const CUSTOMER_NAME_EXIST_TEXT: &str =
    "\n\nЕсли хотите продолжить начатое оформление, выберите имя кнопкой внизу";

pub const GOT_CUSTOMER_NAME_TEXT: &str = "Записано";

pub const GOT_PAYMENT_SCREENSHOT_TEXT: &str = "\
Скриншот отправлен администратору. Когда он будет проверен, вам придет подтверждение.";

pub const PAYMENT_CONFIRMED_TEXT: &str = "Ваш платеж подтвержден";

pub const PAYMENT_CANCELED_TEXT: &str = "\
Платеж не прошел проверку. Проверьте перевод и пришлите скриншот еще раз, \
выбрав услугу заново.";

pub const START_FORM_FILLING_TEXT: &str = "Начинаем заполнять анкету";

pub const FORM_IS_END_TEXT: &str = "Анкета заполнена";

pub const WAITING_PASSPORT_TEXT: &str = "Пришлите фото паспорта";

pub const PASSPORT_RECEIVED_TEXT: &str = "Паспорт получен";

pub const WAITING_EVISA_TEXT: &str = "Пришлите электронную визу (фото или файл)";

pub const EVISA_RECEIVED_TEXT: &str = "Электронная виза получена";

pub const ANSWER_SHOULD_BE_YES_NO_TEXT: &str = "Ответьте кнопкой: Да или Нет";

pub const ANSWER_SHOULD_BE_COUNT_TEXT: &str = "Нужно целое число, попробуйте еще раз";

pub const DOCUMENTS_ARE_READY_TEXT: &str = "\
Все данные получены. Оператор возьмет вашу заявку в работу и назначит встречу.";

pub const OPERATOR_REQUEST_SENT_TEXT: &str = "Запрос отправлен";

pub const OPERATOR_ASSIGN_FAILED_TEXT: &str = "Ошибка при назначении оператора";

pub const OPERATOR_ALREADY_SET_TEXT: &str = "У этого пользователя уже есть роль оператора";

pub const SERVICE_ALREADY_TAKEN_TEXT: &str = "Клиента уже взял другой оператор";

pub const CHOSE_MEETING_PLACE_TEXT: &str = "\n\nВыберите место встречи:";

pub const CHOSE_MEETING_TIME_TEXT: &str = "\n\nВыберите время встречи:";

pub const CHOSE_MEETING_DATE_TEXT: &str = "\n\nВыберите дату встречи:";

pub const MEETING_DATE_CHOSEN_BY_OPERATOR_TEXT: &str =
    "\n\nДату встречи назначит оператор после проверки документов.";

pub fn payment_request_text(service_name: &str, payment_amount: &str, payment_details: &str) -> String {
    format!(
        "Вы собираетесь оплатить услугу:\n\
        {service_name}\n\
        Сумма к оплате: {payment_amount}\n\
        Реквизиты для оплаты:\n\
        {payment_details}\n\
        \nИнструкция:\n\
        1. Выполните перевод\n\
        2. Пришлите скриншот перевода\n\
        3. Когда администратор проверит ваш перевод, вам придет подтверждение"
    )
}

pub fn payment_control_caption(product_name: &str, payment_amount: &str, from_customer: &str) -> String {
    format!(
        "Проверка платежа\n\
        Услуга: {product_name}\n\
        Сумма: {payment_amount}\n\
        От: {from_customer}"
    )
}

pub fn form_field_prompt(field_label: &str, field_type_description: &str) -> String {
    format!("Напишите: {field_label}\n({field_type_description})")
}

pub fn meeting_text(
    product_name: &str,
    customer_name: &str,
    operator_name: &str,
    place_name: &str,
    date_time: &str,
    map_link: Option<&str>,
) -> String {
    let mut text = format!(
        "Встреча\n\
        Услуга: {product_name}\n\
        Клиент: {customer_name}\n\
        Оператор: {operator_name}\n\
        Место: {place_name}\n\
        Время: {date_time}"
    );
    if let Some(link) = map_link {
        text.push_str("\nКарта: ");
        text.push_str(link);
    }
    text
}

/// Renders a stored UTC instant in the timezone customers live in.
pub fn format_local_time(time: chrono::DateTime<chrono::Utc>, offset: chrono::FixedOffset) -> String {
    time.with_timezone(&offset).format("%d.%m.%Y %H:%M").to_string()
}

pub fn form_summary_text(title: &str, entries: &[(&'static str, String)]) -> String {
    let mut text = String::from(title);
    for (label, value) in entries {
        text.push('\n');
        text.push_str(label);
        text.push_str(": ");
        text.push_str(value);
    }
    text
}
