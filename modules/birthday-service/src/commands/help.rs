//! Help command - shows available commands

/// Execute the help command
pub fn execute(admin: bool) -> String {
    let mut text = "*Birthday Bot*\n\n\
    - `/aniversarios [chatId]` - Aniversários, do mais próximo para o mais distante\n\
    - `/idades [chatId]` - Idades, por data de nascimento\n\
    - `/proximo [chatId]` - O próximo aniversário\n\n\
    The chat id is only needed in a private chat."
        .to_string();
    if admin {
        text.push_str(
            "\n\n*Admin:*\n\
            - `/add Name, 1999-11-25[, chatId]`\n\
            - `/remove Name[, 1999-11-25][, chatId]`\n\
            - `/clear [chatId]`",
        );
    }
    text
}
